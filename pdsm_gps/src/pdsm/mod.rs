//! Binary records delivered by the engine's PDSM callback service.

mod decoder;
mod layout;

pub use decoder::{decode_ext_status, is_xtra_download_request, PdEvent, PdEventDecoder, PdEvents};
pub use layout::{ExtRecordLayout, MessageLayout, PdRecordLayout};
