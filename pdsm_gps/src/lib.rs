//! # pdsm_gps
//!
//! A location provider for GPS engines driven over the PDSM remote-procedure
//! interface. The engine is asked for positions over RPC and reports back
//! either through binary PD events or through an NMEA sentence stream; this
//! crate turns both into [`LocationFix`] and [`SatelliteStatus`] reports for
//! a host, and pushes XTRA assistance data and time to the engine.
//!
//! Parsing Sentences
//! =================
//!
//! Sentences are framed by a [`SentenceReader`] and turned into fix state by
//! a [`SentenceParser`]. The reader's `consume()` returns an iterator-like
//! object over the lines completed by the new data:
//! ```
//! use pdsm_gps::{FixAggregator, SentenceParser, SentenceReader, TimeContext};
//!
//! let mut reader = SentenceReader::new();
//! let mut parser = SentenceParser::new(TimeContext::from_system_clock(), 10);
//! let aggregator = FixAggregator::new();
//!
//! let data = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
//! let mut it = reader.consume(data);
//! while let Some(line) = it.next() {
//!     aggregator.update(|state| parser.parse(line, state));
//! }
//!
//! let fix = aggregator.take_publication().location.unwrap();
//! assert!((fix.latitude - 48.1173).abs() < 1e-6);
//! ```
//!
//! Running the Service
//! ===================
//!
//! [`GpsService`] owns the session threads. It needs an [`RpcChannel`] to
//! reach the engine and a [`HostCallbacks`] implementation to report to.
//! Inbound engine callbacks are handed to the [`PdsmDispatcher`] returned by
//! [`GpsService::dispatcher`].

pub mod aggregator;
pub mod callbacks;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod fix;
pub mod nmea;
pub mod pdsm;
pub mod revision;
pub mod rpc;
pub mod service;
pub mod xtra;

pub use crate::{
    aggregator::{FixAggregator, FixState, Publication},
    callbacks::{HostCallbacks, HostEvent, NoopCallbacks},
    codec::{correct_wrapped_altitude, gps_to_unix_ms, AltitudeWrapRule, WordRecord},
    config::{FixSource, GpsConfig},
    error::{ConfigError, RecordError, SentenceError, ServiceError, TransportError, XtraError},
    fix::{GpsStatusValue, LocationFix, LocationFlags, SatelliteStatus, SvInfo},
    nmea::{SentenceKind, SentenceParser, SentenceReader, TimeContext},
    pdsm::{PdEvent, PdEventDecoder, PdEvents},
    revision::{EngineRevision, Leo, Program},
    rpc::{ClientRole, FailurePolicy, PdsmClient, RpcChannel},
    service::{DispatchHandler, GpsService, PdsmDispatcher, SessionState},
    xtra::{XtraFragments, XtraPart, XtraTimeInfo},
};
