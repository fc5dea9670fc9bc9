use bitflags::bitflags;

use crate::constants::MAX_SVS;

bitflags! {
    /// Which fields of a [`LocationFix`] carry valid data.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct LocationFlags: u16 {
        const LAT_LONG = 0x0001;
        const ALTITUDE = 0x0002;
        const SPEED = 0x0004;
        const BEARING = 0x0008;
        const ACCURACY = 0x0010;
    }
}

/// Position report handed to the host.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationFix {
    pub flags: LocationFlags,
    /// Degrees, positive north
    pub latitude: f64,
    /// Degrees, positive east
    pub longitude: f64,
    /// Metres
    pub altitude: f64,
    /// Metres per second over the ground
    pub speed: f32,
    /// Degrees from true north
    pub bearing: f32,
    /// Estimated horizontal error, metres
    pub accuracy: f32,
    /// Milliseconds since the Unix epoch, UTC
    pub timestamp: i64,
}

impl LocationFix {
    pub fn has(&self, flags: LocationFlags) -> bool {
        self.flags.contains(flags)
    }
}

/// One satellite in view.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SvInfo {
    pub prn: i32,
    pub snr: f32,
    pub elevation: f32,
    pub azimuth: f32,
}

/// Satellites in view plus the almanac/ephemeris/used-in-fix bitmasks.
///
/// Bit `prn - 1` of a mask refers to satellite `prn`.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SatelliteStatus {
    pub sv_list: Vec<SvInfo>,
    pub ephemeris_mask: u32,
    pub almanac_mask: u32,
    pub used_in_fix_mask: u32,
}

impl SatelliteStatus {
    pub fn num_svs(&self) -> usize {
        self.sv_list.len()
    }

    /// Appends a satellite unless the list is already full.
    pub fn push(&mut self, sv: SvInfo) -> bool {
        if self.sv_list.len() >= MAX_SVS {
            return false;
        }
        self.sv_list.push(sv);
        true
    }

    pub fn clear(&mut self) {
        self.sv_list.clear();
        self.ephemeris_mask = 0;
        self.almanac_mask = 0;
        self.used_in_fix_mask = 0;
    }
}

/// Sets bit `prn - 1` for every PRN in `1..=32`; others are ignored.
pub fn prn_mask<I: IntoIterator<Item = i32>>(prns: I) -> u32 {
    prns.into_iter()
        .filter(|prn| (1..=MAX_SVS as i32).contains(prn))
        .fold(0, |mask, prn| mask | 1 << (prn - 1))
}

/// Engine and session status reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum GpsStatusValue {
    None = 0,
    SessionBegin = 1,
    SessionEnd = 2,
    EngineOn = 3,
    EngineOff = 4,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prn_mask_bits() {
        assert_eq!(prn_mask([1, 3, 32]), 0x8000_0005);
        assert_eq!(prn_mask([0, -1, 33]), 0);
    }

    #[test]
    fn sv_list_capped() {
        let mut status = SatelliteStatus::default();
        for prn in 0..40 {
            status.push(SvInfo {
                prn,
                ..Default::default()
            });
        }
        assert_eq!(status.num_svs(), MAX_SVS);
    }
}
