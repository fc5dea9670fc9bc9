use tracing::{debug, warn};

use super::ServiceShared;
use crate::revision::EngineRevision;

/// Keeps one position request outstanding while the session runs.
///
/// Each request waits for the engine's DONE event, bounded by the request
/// timeout, before the next one goes out.
pub(crate) fn run_position_poller<R: EngineRevision>(shared: &ServiceShared<R>) {
    debug!("position poller running");
    while shared.signal.wait_for_start() {
        if !shared.signal.begin_request() {
            continue;
        }
        if let Err(e) = shared.client.get_position() {
            warn!("position request failed: {}", e);
        }
        shared.signal.wait_position(shared.request_timeout());
    }
    debug!("position poller stopped");
}
