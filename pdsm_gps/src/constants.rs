/// Seconds between the Unix epoch and the GPS epoch (1980-01-06).
pub const GPS_UNIX_EPOCH_OFFSET: i64 = 315_964_800;

/// GPS-UTC leap second count applied to engine timestamps.
///
/// Fixed at the value the engine firmware shipped with. Later leap seconds
/// are not accounted for.
pub const GPS_LEAP_SECONDS: i64 = 15;

/// Largest sentence the reader accumulates, terminator included.
pub const NMEA_MAX_SIZE: usize = 255;

/// Tokens kept per sentence; anything past this is ignored.
pub const MAX_NMEA_TOKENS: usize = 32;

/// Shortest line handed to the sentence parser.
pub const MIN_SENTENCE_LEN: usize = 9;

/// Satellites reported per status snapshot.
pub const MAX_SVS: usize = 32;

/// Assistance data is pushed to the engine in blocks of this many bytes.
pub const XTRA_BLOCK_SIZE: usize = 400;

/// Fragment numbers travel as one byte on the wire.
pub const XTRA_MAX_PARTS: usize = u8::MAX as usize;

/// The publish timer wakes this long before each fix-frequency boundary.
pub const TIMER_LEAD_MS: u64 = 500;

/// Upper bound on the fix interval accepted by `set_position_mode`, in seconds.
pub const MAX_FIX_FREQUENCY: u32 = 1800;

/// Attempts made when the engine reports it cannot accept a position request yet.
pub const GET_POSITION_ATTEMPTS: u32 = 3;

/// Filename the engine names in an assistance-data download request.
pub const XTRA_FILENAME: &[u8; 8] = b"xtra.bin";
