//! Runs a sentence-driven session against a device node with an engine
//! stub that accepts every call.
//!
//! ```text
//! cargo run --example service -- /dev/smd27 10
//! ```

use std::{sync::Arc, thread, time::Duration};

use pdsm_gps::{
    config::DEFAULT_NMEA_DEVICE, FailurePolicy, FixSource, GpsConfig, GpsService, GpsStatusValue,
    HostCallbacks, LocationFix, Program, SatelliteStatus, TransportError,
};

struct Printer;

impl HostCallbacks for Printer {
    fn on_location(&self, fix: &LocationFix) {
        println!(
            "fix {:.6},{:.6} alt {:.1} m acc {:.1} m flags {:?}",
            fix.latitude, fix.longitude, fix.altitude, fix.accuracy, fix.flags
        );
    }

    fn on_status(&self, status: GpsStatusValue) {
        println!("status {:?}", status);
    }

    fn on_sv_status(&self, status: &SatelliteStatus) {
        println!(
            "{} satellites, used mask {:#010x}",
            status.num_svs(),
            status.used_in_fix_mask
        );
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let device = args.next().unwrap_or_else(|| DEFAULT_NMEA_DEVICE.to_owned());
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10);

    let engine = |program: Program, procedure: u32, args: &[u8]| -> Result<u32, TransportError> {
        println!(
            "rpc {:#010x}/{:#x} ({} bytes)",
            program.id,
            procedure,
            args.len()
        );
        Ok(1)
    };
    let config = GpsConfig::default()
        .with_fix_source(FixSource::Sentences)
        .with_failure_policy(FailurePolicy::Propagate);

    let service: GpsService =
        GpsService::new(Arc::new(engine), Arc::new(Printer), config).with_device_path(device);
    if let Err(e) = service.init().and_then(|()| service.start()) {
        eprintln!("cannot start session: {}", e);
        return;
    }
    thread::sleep(Duration::from_secs(seconds));
    if let Err(e) = service.stop().and_then(|()| service.cleanup()) {
        eprintln!("shutdown failed: {}", e);
    }
}
