use chrono::{FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use super::tokenizer::{str2float, str2int};
use crate::error::SentenceError;

/// Date and zone context needed to turn a sentence's time of day into an
/// absolute timestamp.
///
/// Sentences carry only `hhmmss.sss`; the date comes from the last RMC date
/// field, or from the system clock when none has been seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeContext {
    date: Option<NaiveDate>,
    /// Seconds the local zone is ahead of UTC.
    utc_diff: i32,
}

impl TimeContext {
    /// Context with no cached date and the system zone's current offset.
    pub fn from_system_clock() -> Self {
        Self {
            date: None,
            utc_diff: Local::now().offset().local_minus_utc(),
        }
    }

    pub fn new(date: NaiveDate, utc_diff: i32) -> Self {
        Self {
            date: Some(date),
            utc_diff,
        }
    }

    /// Last date seen in a sentence.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn utc_diff(&self) -> i32 {
        self.utc_diff
    }

    /// Replaces the cached date from a `ddmmyy` token.
    pub fn update_date(&mut self, token: &[u8]) -> Result<(), SentenceError> {
        if token.len() != 6 {
            return Err(SentenceError::InvalidDate);
        }
        let day = str2int(&token[0..2]);
        let month = str2int(&token[2..4]);
        let year = str2int(&token[4..6]);
        if day < 0 || month < 0 || year < 0 {
            return Err(SentenceError::InvalidDate);
        }
        let date = NaiveDate::from_ymd_opt(year + 2000, month as u32, day as u32)
            .ok_or(SentenceError::InvalidDate)?;
        self.date = Some(date);
        Ok(())
    }

    /// Unix milliseconds for an `hhmmss[.sss]` token on the cached date, or
    /// on today's UTC date when no date has been seen.
    pub fn timestamp_ms(&self, token: &[u8]) -> Result<i64, SentenceError> {
        if token.len() < 6 {
            return Err(SentenceError::InvalidTime);
        }
        let hour = str2int(&token[0..2]);
        let minute = str2int(&token[2..4]);
        let seconds = str2float(&token[4..]);
        if hour < 0 || minute < 0 || seconds < 0.0 {
            return Err(SentenceError::InvalidTime);
        }

        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());
        let time = NaiveTime::from_hms_opt(hour as u32, minute as u32, seconds as u32)
            .ok_or(SentenceError::InvalidTime)?;
        // Fields are read as wall-clock time under the cached offset, then
        // shifted back by that offset.
        let zone = FixedOffset::east_opt(self.utc_diff).ok_or(SentenceError::InvalidTime)?;
        let local = zone
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or(SentenceError::InvalidTime)?;
        let fix_time = local.timestamp() + i64::from(self.utc_diff);

        let millis = (seconds * 1000.0) as i64 % 1000;
        Ok(fix_time * 1000 + millis)
    }
}
