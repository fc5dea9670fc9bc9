//! NMEA 0183 ingestion: line framing, tokenizing and fix extraction.

mod parser;
mod reader;
mod time;
mod tokenizer;

pub use parser::{convert_from_hhmm, SentenceKind, SentenceParser};
pub use reader::{SentenceIter, SentenceReader};
pub use time::TimeContext;
pub use tokenizer::{str2float, str2int, Tokenizer};
