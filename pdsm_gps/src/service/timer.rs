use tracing::{debug, trace};

use super::ServiceShared;
use crate::revision::EngineRevision;

/// Publishes the aggregated fix once per fix interval while the session runs.
pub(crate) fn run_publish_timer<R: EngineRevision>(shared: &ServiceShared<R>) {
    debug!("publish timer running");
    shared.aggregator.reset();

    while shared.signal.sleep_while_started(shared.publish_period()) {
        let publication = shared.aggregator.take_publication();
        trace!(
            location = publication.location.is_some(),
            sv_status = publication.sv_status.is_some(),
            "publish cycle"
        );
        if let Some(fix) = &publication.location {
            shared.host.on_location(fix);
        }
        if let Some(status) = &publication.sv_status {
            shared.host.on_sv_status(status);
        }
    }
    debug!("publish timer stopped");
}
