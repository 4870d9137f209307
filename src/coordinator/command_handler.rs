use super::{navigation, CommandError, Coordinator, Step, COORDINATOR_LOG_TARGET};
use crate::engine::{format_time, SeekDirection};
use crate::transport::UserId;
use tracing::{info, instrument};
use url::Url;

#[instrument(skip(coordinator))]
pub(super) fn handle_play_url(coordinator: &Coordinator, user: UserId, link: String) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let task_coordinator = coordinator.clone();
    coordinator.inner.executor.submit("play-url", async move {
        navigation::play_url_task(task_coordinator, user, link).await;
    });
    Ok(())
}

#[instrument(skip(coordinator))]
pub(super) fn handle_search(coordinator: &Coordinator, user: UserId, query: String) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    if coordinator.inner.engine.status().is_playing {
        return Err(already_playing());
    }

    coordinator.inner.transport.notify_user(user, "Searching...");
    let task_coordinator = coordinator.clone();
    coordinator.inner.executor.submit("search-and-play", async move {
        navigation::search_and_play_task(task_coordinator, user, query).await;
    });
    Ok(())
}

#[instrument(skip(coordinator))]
pub(super) async fn handle_toggle_pause(coordinator: &Coordinator, user: UserId) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let inner = &coordinator.inner;
    let status = inner.engine.status();

    if status.is_playing && !status.paused {
        inner.engine.pause_stream().await?;
        inner.transport.set_voice_transmission(false);
        inner
            .transport
            .notify_channel(&format!("{} paused the playback", inner.transport.nickname(user)));
        inner.transport.set_status(&format!("Paused: {}", status.media_title));
        info!(target: COORDINATOR_LOG_TARGET, "Playback paused.");
    } else if status.is_playing {
        inner.engine.resume_stream().await?;
        inner.transport.set_voice_transmission(true);
        inner.transport.set_status(&format!("Playing: {}", status.media_title));
        info!(target: COORDINATOR_LOG_TARGET, "Playback resumed.");
    } else {
        return Err(CommandError::NothingPlaying);
    }
    Ok(())
}

#[instrument(skip(coordinator))]
pub(super) async fn handle_seek(
    coordinator: &Coordinator,
    user: UserId,
    direction: SeekDirection,
    amount: Option<i64>,
) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let inner = &coordinator.inner;
    if !inner.engine.status().is_playing {
        return Err(CommandError::NothingPlaying);
    }
    let seconds = amount.unwrap_or(inner.settings.seek_step);
    inner.engine.seek(direction, seconds).await?;
    Ok(())
}

pub(super) fn handle_navigate(coordinator: &Coordinator, user: UserId, step: Step) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let task_coordinator = coordinator.clone();
    let name = match step {
        Step::Next => "next-track",
        Step::Previous => "previous-track",
    };
    coordinator.inner.executor.submit(name, async move {
        navigation::navigate_task(task_coordinator, user, step).await;
    });
    Ok(())
}

#[instrument(skip(coordinator))]
pub(super) async fn handle_stop(coordinator: &Coordinator, user: UserId) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let inner = &coordinator.inner;

    {
        // is_playing is only meaningful under the switch lock.
        let _switch = inner.session.lock_switch().await;
        if !inner.engine.status().is_playing {
            return Err(CommandError::NothingPlaying);
        }
        inner.engine.stop().await?;
        inner.session.clear();
    }
    inner.transport.set_voice_transmission(false);
    inner
        .transport
        .notify_channel(&format!("{} stopped the playback", inner.transport.nickname(user)));
    coordinator.idle_status();
    info!(target: COORDINATOR_LOG_TARGET, "Playback stopped and session cleared.");
    Ok(())
}

#[instrument(skip(coordinator))]
pub(super) async fn handle_volume(coordinator: &Coordinator, user: UserId, value: Option<u32>) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let inner = &coordinator.inner;

    let Some(volume) = value else {
        let current = inner.engine.status().volume;
        inner
            .transport
            .notify_user(user, &format!("The current volume is {}", current));
        return Ok(());
    };

    let max_volume = inner.settings.max_volume;
    if volume > max_volume {
        return Err(CommandError::Usage(format!("Maximum allowed volume is {}", max_volume)));
    }

    inner.engine.set_volume(volume).await?;
    inner.transport.notify_channel(&format!(
        "{} has changed the volume to {}",
        inner.transport.nickname(user),
        volume
    ));
    Ok(())
}

pub(super) fn handle_get_link(coordinator: &Coordinator, user: UserId) -> Result<(), CommandError> {
    let link = coordinator
        .inner
        .session
        .current_link()
        .filter(|link| is_network_address(link))
        .ok_or(CommandError::NothingPlaying)?;
    coordinator.inner.transport.notify_user(user, &link);
    Ok(())
}

pub(super) fn handle_duration(coordinator: &Coordinator, user: UserId) -> Result<(), CommandError> {
    let status = coordinator.inner.engine.status();
    if !status.is_playing {
        return Err(CommandError::NothingPlaying);
    }

    let elapsed = status.playback_time.unwrap_or(0.0);
    let total = status.duration.unwrap_or(0.0);
    let remaining = total - elapsed;
    coordinator.inner.transport.notify_user(
        user,
        &format!(
            "Total duration: {}. Elapsed time: {}. Remaining time: {}",
            format_time(total),
            format_time(elapsed),
            format_time(remaining)
        ),
    );
    Ok(())
}

pub(super) fn handle_recent_history(coordinator: &Coordinator, user: UserId) -> Result<(), CommandError> {
    let recent = coordinator.inner.session.recent_history();
    if recent.is_empty() {
        coordinator.inner.transport.notify_user(user, "No tracks have been played yet.");
        return Ok(());
    }
    for chunk in recent.chunks() {
        coordinator.inner.transport.notify_user(user, &chunk);
    }
    Ok(())
}

#[instrument(skip(coordinator))]
pub(super) fn handle_play_from_history(coordinator: &Coordinator, user: UserId, index: usize) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let track = coordinator
        .inner
        .session
        .history_entry(index)
        .ok_or_else(|| CommandError::Usage(format!("There is no history entry {}. Usage: history <index>", index)))?;

    let task_coordinator = coordinator.clone();
    coordinator.inner.executor.submit("history-replay", async move {
        navigation::replay_history_task(task_coordinator, user, track).await;
    });
    Ok(())
}

#[instrument(skip(coordinator))]
pub(super) fn handle_download(coordinator: &Coordinator, user: UserId, link: Option<String>) -> Result<(), CommandError> {
    coordinator.ensure_same_channel(user)?;
    let link = link
        .or_else(|| coordinator.inner.session.current_link())
        .ok_or_else(|| CommandError::Usage("Invalid command. Usage: download <link>, or play a track first.".to_string()))?;
    coordinator
        .inner
        .downloads
        .request_download(&coordinator.inner.executor, user, link)
}

pub(super) fn already_playing() -> CommandError {
    CommandError::Busy(
        "The bot is already playing something. Please stop the playback before attempting to play something else"
            .to_string(),
    )
}

/// True for links that point at a remote http(s) host rather than a local file.
pub(super) fn is_network_address(link: &str) -> bool {
    match Url::parse(link) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}
