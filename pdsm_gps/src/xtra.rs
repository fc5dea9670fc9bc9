//! XTRA assistance data: fragmenting for injection and time assistance.

use tracing::{debug, info};

use crate::{
    constants::{XTRA_BLOCK_SIZE, XTRA_MAX_PARTS},
    error::XtraError,
    revision::EngineRevision,
    rpc::PdsmClient,
};

/// One numbered fragment of an assistance blob. Parts count from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XtraPart<'a> {
    pub part: u8,
    pub total: u8,
    pub data: &'a [u8],
}

/// Splits an assistance blob into [`XTRA_BLOCK_SIZE`] fragments.
#[derive(Debug, Clone)]
pub struct XtraFragments<'a> {
    chunks: std::slice::Chunks<'a, u8>,
    next: u8,
    total: u8,
}

impl<'a> XtraFragments<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, XtraError> {
        Self::with_block_size(data, XTRA_BLOCK_SIZE)
    }

    pub fn with_block_size(data: &'a [u8], block_size: usize) -> Result<Self, XtraError> {
        if data.is_empty() {
            return Err(XtraError::Empty);
        }
        let parts = data.len().div_ceil(block_size);
        let total = u8::try_from(parts)
            .ok()
            .filter(|_| parts <= XTRA_MAX_PARTS)
            .ok_or(XtraError::TooLarge { parts })?;
        Ok(Self {
            chunks: data.chunks(block_size),
            next: 1,
            total,
        })
    }

    pub fn total(&self) -> u8 {
        self.total
    }
}

impl<'a> Iterator for XtraFragments<'a> {
    type Item = XtraPart<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.chunks.next()?;
        let part = XtraPart {
            part: self.next,
            total: self.total,
            data,
        };
        self.next = self.next.wrapping_add(1);
        Some(part)
    }
}

/// Engine result that marks a rejected fragment.
const XTRA_REJECTED: u32 = u32::MAX;

/// Pushes `data` to the engine fragment by fragment.
///
/// Stops at the first fragment that fails; fragments already accepted are
/// not withdrawn. Returns the engine's result for the final fragment as is,
/// even when it is the rejection code.
pub fn inject_xtra_data<R: EngineRevision>(
    client: &PdsmClient<R>,
    data: &[u8],
) -> Result<u32, XtraError> {
    let fragments = XtraFragments::new(data)?;
    let total = fragments.total();
    debug!(size = data.len(), total, "injecting assistance data");

    let mut last = 0;
    for fragment in fragments {
        last = client
            .xtra_set_data(&fragment)
            .map_err(|source| XtraError::Transport {
                part: fragment.part,
                source,
            })?;
        if last == XTRA_REJECTED && fragment.part < total {
            return Err(XtraError::Rejected {
                part: fragment.part,
                total,
            });
        }
    }
    info!(size = data.len(), total, "assistance data injected");
    Ok(last)
}

/// Time assistance sent alongside XTRA data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XtraTimeInfo {
    /// Milliseconds since the Unix epoch
    pub time_utc: u64,
    /// Milliseconds
    pub uncertainty: u32,
    pub ref_to_utc: bool,
    pub force: bool,
}

impl XtraTimeInfo {
    /// `utc_ms` was sampled at `reference_ms` of elapsed realtime; advance it
    /// to `now_elapsed_ms`.
    pub fn new(utc_ms: i64, reference_ms: i64, now_elapsed_ms: i64, uncertainty: u32) -> Self {
        let time_utc = utc_ms.saturating_add(now_elapsed_ms - reference_ms);
        Self {
            time_utc: time_utc.max(0) as u64,
            uncertainty,
            ref_to_utc: true,
            force: true,
        }
    }
}

/// Milliseconds since boot, including time spent suspended.
#[allow(clippy::useless_conversion)]
pub fn elapsed_realtime_ms() -> i64 {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    let clock = libc::CLOCK_BOOTTIME;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let clock = libc::CLOCK_MONOTONIC;

    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    if unsafe { libc::clock_gettime(clock, &mut ts) } != 0 {
        debug!("clock_gettime failed: {}", std::io::Error::last_os_error());
        return 0;
    }
    i64::from(ts.tv_sec) * 1000 + i64::from(ts.tv_nsec) / 1_000_000
}
