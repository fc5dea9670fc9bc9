/// Word offsets of the fields in a PD event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdRecordLayout {
    pub event: usize,
    /// GPS seconds; zero when the engine has no time
    pub timestamp: usize,
    pub latitude_hi: usize,
    pub latitude_lo: usize,
    pub longitude_hi: usize,
    pub longitude_lo: usize,
    /// Decimetres, unsigned
    pub altitude: usize,
    /// Tenths of km/h
    pub speed: usize,
    /// Tenths of a degree
    pub heading: usize,
    /// Tenths of HDOP, doubled
    pub hdop: usize,
    pub used_in_fix_mask: usize,
    /// Low five bits hold the count
    pub sv_count: usize,
    pub sv_list: usize,
    pub sv_stride: usize,
    pub sv_prn: usize,
    pub sv_elevation: usize,
    /// `azimuth * 100 + snr`
    pub sv_azimuth_snr: usize,
}

impl PdRecordLayout {
    /// Words needed before any fix field may be read.
    pub fn min_fix_words(&self) -> usize {
        self.sv_list
    }
}

/// Word offsets in an extended-status payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtRecordLayout {
    pub sv_count: usize,
    pub sv_list: usize,
    pub sv_stride: usize,
    pub sv_prn: usize,
    /// Tenths of dB-Hz
    pub sv_snr: usize,
    pub sv_azimuth: usize,
    pub sv_elevation: usize,
}

impl ExtRecordLayout {
    pub fn min_words(&self) -> usize {
        self.sv_list
    }
}

/// Framing of an inbound callback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLayout {
    pub service_id: usize,
    pub procedure_id: usize,
    /// First payload word
    pub payload: usize,
    /// Byte offset of the requested filename inside an XTRA event payload
    pub xtra_filename: usize,
}
