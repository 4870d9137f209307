use super::{Inner, COORDINATOR_LOG_TARGET};
use tracing::debug;

/// Engine-side notification that the loaded track stopped on its own.
///
/// Ignored while an explicit switch is in progress. Otherwise voice goes off
/// and the idle status comes back.
pub(super) fn on_playback_end(inner: &Inner) {
    let handled = inner.session.end_of_track(|| {
        inner.transport.set_voice_transmission(false);
        inner.transport.set_status(&inner.settings.status_message);
    });

    if handled {
        debug!(target: COORDINATOR_LOG_TARGET, "Track ended, session is idle.");
    } else {
        debug!(target: COORDINATOR_LOG_TARGET, "End of track ignored during a switch.");
    }
}
