use std::{fmt, io};

/// Failure reported by the RPC transport.
#[derive(Debug)]
pub enum TransportError {
    /// The engine could not be reached or the call did not complete.
    CallFailed {
        program: u32,
        procedure: u32,
        reason: String,
    },
    /// The engine is alive but cannot accept this request yet.
    Busy { procedure: u32 },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::CallFailed {
                program,
                procedure,
                reason,
            } => write!(
                f,
                "RPC call {:#x} on program {:#010x} failed: {}",
                procedure, program, reason
            ),
            TransportError::Busy { procedure } => {
                write!(f, "engine busy, RPC call {:#x} not accepted", procedure)
            },
        }
    }
}

impl std::error::Error for TransportError {}

/// Error raised while decoding an engine record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Payload does not end on a word boundary.
    Misaligned { len: usize },
    /// Record is shorter than its layout requires.
    TooShort {
        record: &'static str,
        expect: usize,
        got: usize,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Misaligned { len } => {
                write!(f, "record length {} is not a multiple of 4", len)
            },
            RecordError::TooShort {
                record,
                expect,
                got,
            } => write!(
                f,
                "Invalid record({}) length, expect at least {} words, got {}",
                record, expect, got
            ),
        }
    }
}

impl std::error::Error for RecordError {}

/// Sentence fields that could not be turned into a fix value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceError {
    InvalidTime,
    InvalidDate,
    InvalidCoordinate,
}

impl fmt::Display for SentenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentenceError::InvalidTime => f.write_str("invalid time field"),
            SentenceError::InvalidDate => f.write_str("invalid date field"),
            SentenceError::InvalidCoordinate => f.write_str("invalid latitude/longitude"),
        }
    }
}

impl std::error::Error for SentenceError {}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read GPS configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Assistance data injection failure.
#[derive(Debug)]
pub enum XtraError {
    Empty,
    TooLarge { parts: usize },
    /// The engine refused a fragment; later fragments were not sent.
    Rejected { part: u8, total: u8 },
    Transport { part: u8, source: TransportError },
}

impl fmt::Display for XtraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XtraError::Empty => f.write_str("no assistance data to inject"),
            XtraError::TooLarge { parts } => write!(
                f,
                "assistance data needs {} fragments, at most {} supported",
                parts,
                crate::constants::XTRA_MAX_PARTS
            ),
            XtraError::Rejected { part, total } => {
                write!(f, "engine rejected assistance fragment {}/{}", part, total)
            },
            XtraError::Transport { part, source } => {
                write!(f, "assistance fragment {} not delivered: {}", part, source)
            },
        }
    }
}

impl std::error::Error for XtraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XtraError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors surfaced through the service control surface.
#[derive(Debug)]
pub enum ServiceError {
    NotInitialized,
    Transport(TransportError),
    Xtra(XtraError),
    Io(io::Error),
    /// The control loop did not acknowledge a command in time.
    ControlTimeout,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotInitialized => f.write_str("GPS service is not initialized"),
            ServiceError::Transport(e) => write!(f, "transport: {}", e),
            ServiceError::Xtra(e) => write!(f, "xtra: {}", e),
            ServiceError::Io(e) => write!(f, "io: {}", e),
            ServiceError::ControlTimeout => f.write_str("control loop did not respond"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Transport(e) => Some(e),
            ServiceError::Xtra(e) => Some(e),
            ServiceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for ServiceError {
    fn from(e: TransportError) -> Self {
        ServiceError::Transport(e)
    }
}

impl From<XtraError> for ServiceError {
    fn from(e: XtraError) -> Self {
        ServiceError::Xtra(e)
    }
}

impl From<io::Error> for ServiceError {
    fn from(e: io::Error) -> Self {
        ServiceError::Io(e)
    }
}
