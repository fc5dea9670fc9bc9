use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use tracing::{debug, trace, warn};

use super::ServiceShared;
use crate::{
    codec::WordRecord,
    config::FixSource,
    pdsm::{decode_ext_status, is_xtra_download_request, PdEventDecoder, PdEvents},
    revision::EngineRevision,
};

/// Reply sent for every inbound callback.
pub const CALLBACK_ACK: u32 = 0;

/// Receiver of inbound engine callback messages.
pub trait DispatchHandler: Send + Sync {
    /// Handles one raw callback message and returns the reply word.
    fn dispatch(&self, message: &[u8]) -> u32;
}

/// Routes PDSM and ATL callbacks to the decoders and the host.
pub struct PdsmDispatcher<R: EngineRevision> {
    shared: Arc<ServiceShared<R>>,
    /// Extended-status events seen since the last position fix. Starts at one
    /// so the first report after init goes through.
    no_fix: AtomicU32,
}

impl<R: EngineRevision> PdsmDispatcher<R> {
    pub(crate) fn new(shared: Arc<ServiceShared<R>>) -> Self {
        Self {
            shared,
            no_fix: AtomicU32::new(1),
        }
    }

    fn decoder(&self) -> PdEventDecoder {
        PdEventDecoder {
            layout: R::PD_LAYOUT,
            altitude_rule: R::altitude_rule(),
            precision: self.shared.config.measurement_precision,
            decode_fix: self.shared.config.fix_source == FixSource::Rpc,
        }
    }

    fn dispatch_pdsm(&self, message: WordRecord<'_>) {
        let layout = R::MESSAGE_LAYOUT;
        let procedure = message.word(layout.procedure_id);
        let payload = message.tail(layout.payload);

        if procedure == R::CALLBACKS.pd_event {
            self.on_pd_event(payload);
        } else if procedure == R::CALLBACKS.ext_status {
            self.on_ext_status(payload);
        } else if procedure == R::CALLBACKS.xtra_event {
            if is_xtra_download_request(payload, layout.xtra_filename) {
                debug!("engine requested XTRA download");
                self.shared.host.on_xtra_download_request();
            }
        } else {
            trace!(procedure, "unhandled PDSM callback");
        }
    }

    fn on_pd_event(&self, payload: WordRecord<'_>) {
        let event = match self.decoder().decode(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("malformed PD event: {}", e);
                let raw = PdEvents::from_bits_retain(payload.word(R::PD_LAYOUT.event));
                if raw.contains(PdEvents::DONE) {
                    self.shared.signal.position_ready();
                }
                return;
            },
        };
        debug!(events = ?event.events, "PD event");

        if event.gps_done() {
            self.no_fix.store(1, Ordering::Relaxed);
        }
        if let Some(status) = &event.sv_status {
            self.shared.host.on_sv_status(status);
        }
        if event.has_fix() {
            self.no_fix.store(0, Ordering::Relaxed);
        }
        if let Some(fix) = &event.location {
            self.shared.host.on_location(fix);
        }
        if event.position_ready() {
            self.shared.signal.position_ready();
        }
    }

    fn on_ext_status(&self, payload: WordRecord<'_>) {
        if self.shared.config.fix_source != FixSource::Rpc {
            return;
        }
        let no_fix = self.no_fix.fetch_add(1, Ordering::Relaxed) + 1;
        if no_fix < 2 {
            return;
        }
        match decode_ext_status(&R::EXT_LAYOUT, payload) {
            Ok(status) => self.shared.host.on_sv_status(&status),
            Err(e) => warn!("malformed extended status: {}", e),
        }
    }
}

impl<R: EngineRevision> DispatchHandler for PdsmDispatcher<R> {
    fn dispatch(&self, message: &[u8]) -> u32 {
        let message = match WordRecord::new(message) {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping callback: {}", e);
                return CALLBACK_ACK;
            },
        };
        let Some(service) = message.get(R::MESSAGE_LAYOUT.service_id) else {
            warn!(len = message.len_words(), "callback too short to route");
            return CALLBACK_ACK;
        };

        if service == R::PDSM_CALLBACK_SERVICE {
            self.dispatch_pdsm(message);
        } else if service == R::ATL_CALLBACK_SERVICE {
            debug!("ATL callback");
        } else {
            debug!(service, "callback for unknown service");
        }
        CALLBACK_ACK
    }
}
