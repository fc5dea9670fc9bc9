use std::sync::mpsc::Sender;

use crate::fix::{GpsStatusValue, LocationFix, SatelliteStatus};

/// Host-side receiver of everything the service reports.
///
/// Calls may arrive from the control, timer and RPC dispatch threads.
/// Implementations should return quickly.
pub trait HostCallbacks: Send + Sync {
    fn on_location(&self, _fix: &LocationFix) {}
    fn on_status(&self, _status: GpsStatusValue) {}
    fn on_sv_status(&self, _status: &SatelliteStatus) {}
    /// Raw sentence text with the wall-clock receive time.
    fn on_nmea(&self, _timestamp_ms: i64, _sentence: &str) {}
    /// The engine asked for a fresh XTRA file.
    fn on_xtra_download_request(&self) {}
}

/// Owned copy of one host callback.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostEvent {
    Location(LocationFix),
    Status(GpsStatusValue),
    SvStatus(SatelliteStatus),
    Nmea { timestamp_ms: i64, sentence: String },
    XtraDownloadRequest,
}

/// Forward callbacks as [`HostEvent`]s; a dropped receiver discards them.
impl HostCallbacks for Sender<HostEvent> {
    fn on_location(&self, fix: &LocationFix) {
        let _ = self.send(HostEvent::Location(fix.clone()));
    }

    fn on_status(&self, status: GpsStatusValue) {
        let _ = self.send(HostEvent::Status(status));
    }

    fn on_sv_status(&self, status: &SatelliteStatus) {
        let _ = self.send(HostEvent::SvStatus(status.clone()));
    }

    fn on_nmea(&self, timestamp_ms: i64, sentence: &str) {
        let _ = self.send(HostEvent::Nmea {
            timestamp_ms,
            sentence: sentence.to_owned(),
        });
    }

    fn on_xtra_download_request(&self) {
        let _ = self.send(HostEvent::XtraDownloadRequest);
    }
}

/// Callbacks that ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl HostCallbacks for NoopCallbacks {}
