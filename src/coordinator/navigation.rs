//! Background tasks that stop, load and switch tracks.
//!
//! Every task here holds the session's switch lock for its whole stop/load
//! sequence. Explicit switches (next, previous, history replay) additionally
//! raise the end-of-track guard before stopping the old track, so the stop
//! notification the engine emits for it never reaches the idle handler.

use super::{command_handler, CommandError, Coordinator, Step, StepRefusal, COORDINATOR_LOG_TARGET};
use crate::provider::Track;
use crate::transport::UserId;
use tracing::{debug, info, instrument, warn};

#[instrument(skip(coordinator))]
pub(super) async fn play_url_task(coordinator: Coordinator, user: UserId, link: String) {
    let result = async {
        let _switch = coordinator.inner.session.lock_switch().await;
        start_playback(&coordinator, Track::new(link.clone(), link)).await
    }
    .await;

    match result {
        Ok(_) => {
            let inner = &coordinator.inner;
            inner.transport.notify_channel(&format!(
                "{} requested playing from a URL",
                inner.transport.nickname(user)
            ));
        }
        Err(e) => coordinator.report_error(user, &e),
    }
}

#[instrument(skip(coordinator))]
pub(super) async fn search_and_play_task(coordinator: Coordinator, user: UserId, query: String) {
    let inner = &coordinator.inner;
    let results = match inner.provider.search(&query).await {
        Ok(results) => results,
        Err(e) => {
            coordinator.report_error(user, &CommandError::Provider(e.to_string()));
            return;
        }
    };

    let Some(first) = results.first().cloned() else {
        info!(target: COORDINATOR_LOG_TARGET, "Search for '{}' returned nothing.", query);
        inner
            .transport
            .notify_user(user, &format!("No results found for '{}'.", query));
        return;
    };
    debug!(target: COORDINATOR_LOG_TARGET, "Search returned {} results.", results.len());

    let result = async {
        let _switch = inner.session.lock_switch().await;
        // Another request may have started a track while this search ran.
        if inner.engine.status().is_playing {
            return Err(command_handler::already_playing());
        }
        inner.session.replace_results(results);
        start_playback(&coordinator, first).await
    }
    .await;

    match result {
        Ok(track) => inner.transport.notify_channel(&format!(
            "{} requested to play: {}",
            inner.transport.nickname(user),
            track.title
        )),
        Err(e) => coordinator.report_error(user, &e),
    }
}

#[instrument(skip(coordinator))]
pub(super) async fn navigate_task(coordinator: Coordinator, user: UserId, step: Step) {
    match navigate(&coordinator, step).await {
        Ok(track) => coordinator
            .inner
            .transport
            .notify_user(user, &format!("Playing: {}", track.title)),
        Err(e) => coordinator.report_error(user, &e),
    }
}

async fn navigate(coordinator: &Coordinator, step: Step) -> Result<Track, CommandError> {
    let inner = &coordinator.inner;
    let _switch = inner.session.lock_switch().await;

    let (index, track) = inner.session.peek_step(step).map_err(refusal)?;
    inner.session.begin_switch();
    stop_current(coordinator).await;
    inner.session.commit_index(index);
    start_playback(coordinator, track).await
}

#[instrument(skip(coordinator))]
pub(super) async fn replay_history_task(coordinator: Coordinator, user: UserId, track: Track) {
    let result = async {
        let _switch = coordinator.inner.session.lock_switch().await;
        coordinator.inner.session.begin_switch();
        stop_current(&coordinator).await;
        start_playback(&coordinator, track).await
    }
    .await;

    match result {
        Ok(track) => {
            let inner = &coordinator.inner;
            inner.transport.notify_channel(&format!(
                "{} requested to play {} from history",
                inner.transport.nickname(user),
                track.title
            ));
        }
        Err(e) => coordinator.report_error(user, &e),
    }
}

/// Stops the old track inside a switch window. A failed stop is logged and the load still runs.
async fn stop_current(coordinator: &Coordinator) {
    if let Err(e) = coordinator.inner.engine.stop().await {
        warn!(target: COORDINATOR_LOG_TARGET, "Stopping the previous track failed: {}", e);
    }
}

/// Loads `track` and records the outcome. Callers hold the switch lock.
///
/// On success the track lands in history, under the engine-reported title when
/// the caller only knew the link.
async fn start_playback(coordinator: &Coordinator, track: Track) -> Result<Track, CommandError> {
    let inner = &coordinator.inner;
    inner.transport.set_voice_transmission(true);

    match inner.engine.play_stream(&track.link).await {
        Ok(()) => {
            let reported = inner.engine.status().media_title;
            let track = if track.title == track.link && !reported.is_empty() {
                Track::new(reported, track.link)
            } else {
                track
            };
            inner.session.finish_load(track.clone());
            coordinator.playing_status();
            info!(target: COORDINATOR_LOG_TARGET, "Now playing '{}'.", track.title);
            Ok(track)
        }
        Err(e) => {
            warn!(target: COORDINATOR_LOG_TARGET, "Loading '{}' failed: {}", track.link, e);
            inner.session.fail_load();
            inner.transport.set_voice_transmission(false);
            coordinator.idle_status();
            Err(CommandError::Engine(e))
        }
    }
}

fn refusal(refusal: StepRefusal) -> CommandError {
    let message = match refusal {
        StepRefusal::NoResults => "No search results to play from.",
        StepRefusal::EndOfResults => "You've reached the end of results.",
        StepRefusal::StartOfResults => "You are at the beginning of results.",
    };
    CommandError::Busy(message.to_string())
}
