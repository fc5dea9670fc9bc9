use bitflags::bitflags;
use tracing::{debug, trace};

use super::layout::{ExtRecordLayout, PdRecordLayout};
use crate::{
    codec::{gps_to_unix_ms, AltitudeWrapRule, WordRecord},
    constants::XTRA_FILENAME,
    error::RecordError,
    fix::{LocationFix, LocationFlags, SatelliteStatus, SvInfo},
};

bitflags! {
    /// Event bits of a PD event record.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct PdEvents: u32 {
        const POSITION = 0x0000_0001;
        const VELOCITY = 0x0000_0002;
        const HEIGHT = 0x0000_0004;
        const DONE = 0x0000_0008;
        const END = 0x0000_0010;
        const BEGIN = 0x0000_0020;
        const COMM_BEGIN = 0x0000_0040;
        const COMM_CONNECTED = 0x0000_0080;
        const COMM_DONE = 0x0000_0200;
        const GPS_BEGIN = 0x0000_4000;
        const GPS_DONE = 0x0000_8000;
        const UPDATE_FAIL = 0x0100_0000;
    }
}

impl PdEvents {
    fn carries_fix(self) -> bool {
        self.intersects(PdEvents::POSITION | PdEvents::VELOCITY | PdEvents::HEIGHT)
    }
}

/// Result of decoding one PD event.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PdEvent {
    pub events: PdEvents,
    pub sv_status: Option<SatelliteStatus>,
    /// Present when any location flag was set
    pub location: Option<LocationFix>,
}

impl PdEvent {
    /// The engine finished this position request.
    pub fn position_ready(&self) -> bool {
        self.events.contains(PdEvents::DONE)
    }

    pub fn gps_done(&self) -> bool {
        self.events.contains(PdEvents::GPS_DONE)
    }

    /// A position with a valid timestamp was decoded.
    pub fn has_fix(&self) -> bool {
        self.location
            .as_ref()
            .is_some_and(|fix| fix.has(LocationFlags::LAT_LONG))
    }
}

/// Decodes PD event payloads into fix and satellite records.
#[derive(Debug, Clone, Copy)]
pub struct PdEventDecoder {
    pub layout: PdRecordLayout,
    pub altitude_rule: AltitudeWrapRule,
    pub precision: u8,
    /// Position, velocity and height are skipped when sentences are the fix source.
    pub decode_fix: bool,
}

impl PdEventDecoder {
    pub fn decode(&self, payload: WordRecord<'_>) -> Result<PdEvent, RecordError> {
        let layout = &self.layout;
        payload.ensure_len("PD event", layout.event + 1)?;

        let events = PdEvents::from_bits_retain(payload.word(layout.event));
        trace!(events = ?events, "PD event");
        let mut out = PdEvent {
            events,
            ..Default::default()
        };
        if !self.decode_fix || !events.carries_fix() {
            return Ok(out);
        }
        payload.ensure_len("PD event", layout.min_fix_words())?;

        let mut fix = LocationFix::default();
        let mut timestamp_missing = false;

        if events.contains(PdEvents::POSITION) {
            out.sv_status = Some(self.satellites(payload));

            let gps_seconds = payload.word(layout.timestamp);
            if gps_seconds == 0 {
                debug!("position event without a timestamp");
                timestamp_missing = true;
            } else {
                fix.timestamp = gps_to_unix_ms(gps_seconds);
                fix.flags |= LocationFlags::LAT_LONG;

                if payload.word(layout.hdop) != 0 {
                    fix.flags |= LocationFlags::ACCURACY;
                    let hdop = payload.scaled(layout.hdop, 10.0) / 2.0;
                    fix.accuracy = (hdop * f64::from(self.precision)) as f32;
                }

                fix.latitude =
                    payload.split_i64(layout.latitude_hi, layout.latitude_lo) as f64 / 1.0e8;
                fix.longitude =
                    payload.split_i64(layout.longitude_hi, layout.longitude_lo) as f64 / 1.0e8;
            }
        }

        if events.contains(PdEvents::VELOCITY) {
            fix.flags |= LocationFlags::SPEED | LocationFlags::BEARING;
            // km/h to m/s
            fix.speed = (payload.scaled(layout.speed, 10.0) / 3.6) as f32;
            fix.bearing = payload.scaled(layout.heading, 10.0) as f32;
        }

        if events.contains(PdEvents::HEIGHT) {
            fix.flags |= LocationFlags::ALTITUDE;
            fix.altitude = self.altitude_rule.apply(payload.word(layout.altitude));
        }

        if !timestamp_missing && !fix.flags.is_empty() {
            out.location = Some(fix);
        }
        Ok(out)
    }

    fn satellites(&self, payload: WordRecord<'_>) -> SatelliteStatus {
        let layout = &self.layout;
        let count = (payload.word(layout.sv_count) & 0x1F) as usize;
        let mut status = SatelliteStatus {
            used_in_fix_mask: payload.word(layout.used_in_fix_mask),
            ..Default::default()
        };

        for i in 0..count {
            let base = layout.sv_list + i * layout.sv_stride;
            if base + layout.sv_stride > payload.len_words() {
                debug!(count, decoded = i, "satellite list truncated");
                break;
            }
            let azimuth_snr = payload.word(base + layout.sv_azimuth_snr);
            status.push(SvInfo {
                prn: payload.word(base + layout.sv_prn) as i32,
                elevation: payload.word(base + layout.sv_elevation) as f32,
                azimuth: (azimuth_snr / 100) as f32,
                snr: (azimuth_snr % 100) as f32,
            });
        }
        status
    }
}

/// Satellite list carried by an extended-status event.
pub fn decode_ext_status(
    layout: &ExtRecordLayout,
    payload: WordRecord<'_>,
) -> Result<SatelliteStatus, RecordError> {
    payload.ensure_len("extended status", layout.min_words())?;

    let count = payload.word(layout.sv_count) as usize;
    let mut status = SatelliteStatus::default();
    for i in 0..count {
        let base = layout.sv_list + i * layout.sv_stride;
        if base + layout.sv_stride > payload.len_words() {
            break;
        }
        let sv = SvInfo {
            prn: payload.word(base + layout.sv_prn) as i32,
            elevation: payload.word(base + layout.sv_elevation) as f32,
            azimuth: payload.word(base + layout.sv_azimuth) as f32,
            snr: payload.scaled(base + layout.sv_snr, 10.0) as f32,
        };
        if !status.push(sv) {
            break;
        }
    }
    Ok(status)
}

/// Whether an XTRA event payload asks for a fresh assistance file.
pub fn is_xtra_download_request(payload: WordRecord<'_>, filename_offset: usize) -> bool {
    payload
        .as_bytes()
        .get(filename_offset..filename_offset + XTRA_FILENAME.len())
        .is_some_and(|name| name == XTRA_FILENAME)
}
