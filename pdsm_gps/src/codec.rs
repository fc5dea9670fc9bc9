//! Word-level access to engine records.
//!
//! Records arrive as sequences of 32-bit big-endian words. Fields are
//! addressed by word index; the helpers here turn raw words into the
//! physical units the fix types carry.

use byteorder::{BigEndian, ByteOrder};

use crate::{
    constants::{GPS_LEAP_SECONDS, GPS_UNIX_EPOCH_OFFSET},
    error::RecordError,
};

/// A borrowed view over a word-aligned record.
#[derive(Debug, Clone, Copy)]
pub struct WordRecord<'a> {
    bytes: &'a [u8],
}

impl<'a> WordRecord<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, RecordError> {
        if bytes.len() % 4 != 0 {
            return Err(RecordError::Misaligned { len: bytes.len() });
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len_words(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn ensure_len(&self, record: &'static str, words: usize) -> Result<(), RecordError> {
        if self.len_words() < words {
            return Err(RecordError::TooShort {
                record,
                expect: words,
                got: self.len_words(),
            });
        }
        Ok(())
    }

    /// Word at `index`, or `None` past the end of the record.
    pub fn get(&self, index: usize) -> Option<u32> {
        let start = index.checked_mul(4)?;
        self.bytes
            .get(start..start + 4)
            .map(BigEndian::read_u32)
    }

    /// Word at `index`; reads past the end yield zero.
    ///
    /// Callers check the record length against their layout first.
    pub fn word(&self, index: usize) -> u32 {
        self.get(index).unwrap_or(0)
    }

    /// Record starting at word `index`, empty if `index` is past the end.
    pub fn tail(&self, index: usize) -> WordRecord<'a> {
        let start = index.saturating_mul(4).min(self.bytes.len());
        WordRecord {
            bytes: &self.bytes[start..],
        }
    }

    /// Raw word divided by `scale`.
    pub fn scaled(&self, index: usize, scale: f64) -> f64 {
        f64::from(self.word(index)) / scale
    }

    /// Signed 64-bit value split across a high and a low word.
    pub fn split_i64(&self, hi: usize, lo: usize) -> i64 {
        let raw = (u64::from(self.word(hi)) << 32) | u64::from(self.word(lo));
        raw as i64
    }
}

/// Converts an engine timestamp (GPS seconds) into Unix milliseconds.
pub fn gps_to_unix_ms(gps_seconds: u32) -> i64 {
    (i64::from(gps_seconds) + GPS_UNIX_EPOCH_OFFSET - GPS_LEAP_SECONDS) * 1000
}

/// How altitude words that wrapped around zero are recovered.
///
/// The engine reports altitude in decimetres as an unsigned word, so heights
/// below the ellipsoid show up as huge values. Anything at or past
/// `threshold_m` is taken to be a negative height that wrapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeWrapRule {
    pub enabled: bool,
    pub threshold_m: f64,
}

impl AltitudeWrapRule {
    pub const DISABLED: AltitudeWrapRule = AltitudeWrapRule {
        enabled: false,
        threshold_m: 0.0,
    };

    /// Altitude in metres for the raw decimetre word.
    pub fn apply(&self, raw: u32) -> f64 {
        let metres = f64::from(raw) / 10.0;
        if self.enabled && metres >= self.threshold_m {
            (i64::from(raw) - (1i64 << 32)) as f64 / 10.0
        } else {
            metres
        }
    }
}

impl Default for AltitudeWrapRule {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_m: 1_000_000.0,
        }
    }
}

/// Altitude in metres using the default wrap rule.
pub fn correct_wrapped_altitude(raw: u32) -> f64 {
    AltitudeWrapRule::default().apply(raw)
}
