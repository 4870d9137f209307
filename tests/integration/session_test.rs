//! Integration tests for direct playback commands
//!
//! The coordinator runs against fake collaborators; every test drives it
//! through text commands the way a chat user would.

use crate::test_utils::constants::*;
use crate::test_utils::{tracks, Harness};
use r_playbot::coordinator::SwitchPhase;

#[cfg(test)]
mod session_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_from_other_channel_are_refused() {
        let harness = Harness::new();
        harness.provider.with_results("song", tracks("Song", 2));

        harness.run(CAROL, "/u https://radio.example/stream").await;
        harness.run(CAROL, "/p song").await;
        harness.run(CAROL, "/n").await;

        assert!(harness.engine.calls().is_empty());
        assert_eq!(harness.transport.to_user(CAROL), vec!["You are not in the same channel"; 3]);
    }

    #[tokio::test]
    async fn test_play_url_loads_and_announces() {
        let harness = Harness::new();
        let link = "https://radio.example/stream";
        harness.engine.set_title(link, "Morning Radio");

        harness.run(ALICE, &format!("/play-url {}", link)).await;

        assert_eq!(harness.engine.played(), vec![link.to_string()]);
        assert_eq!(harness.transport.to_channel(), vec!["alice requested playing from a URL"]);
        assert_eq!(harness.transport.last_status().as_deref(), Some("Playing: Morning Radio"));
        assert!(harness.transport.voice());

        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.current_link.as_deref(), Some(link));
        assert_eq!(snapshot.phase, SwitchPhase::Steady);
        let entry = harness.coordinator.session().history_entry(1).unwrap();
        assert_eq!(entry.title, "Morning Radio");
    }

    #[tokio::test]
    async fn test_failed_load_falls_back_to_idle() {
        let harness = Harness::new();
        let link = "https://radio.example/dead";
        harness.engine.fail_link(link);

        harness.run(ALICE, &format!("/u {}", link)).await;

        let notices = harness.transport.to_user(ALICE);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Playback error:"));
        assert!(harness.transport.to_channel().is_empty());
        assert_eq!(harness.transport.last_status().as_deref(), Some(IDLE_STATUS));
        assert!(!harness.transport.voice());

        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.current_link, None);
        assert_eq!(snapshot.phase, SwitchPhase::Idle);
        assert!(harness.coordinator.session().recent_history().is_empty());
    }

    #[tokio::test]
    async fn test_search_plays_first_result() {
        let harness = Harness::new();
        let results = tracks("Song", 3);
        harness.provider.with_results("lofi beats", results.clone());

        harness.run(ALICE, "/p lofi beats").await;

        assert_eq!(harness.engine.played(), vec![results[0].link.clone()]);
        assert_eq!(harness.transport.to_user(ALICE), vec!["Searching..."]);
        assert_eq!(harness.transport.to_channel(), vec!["alice requested to play: Song 1"]);

        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.search_results, results);
        assert_eq!(snapshot.current_search_index, 0);
        assert_eq!(snapshot.current_link, Some(results[0].link.clone()));
    }

    #[tokio::test]
    async fn test_empty_search_changes_nothing() {
        let harness = Harness::new();

        harness.run(ALICE, "/p nothing matches").await;

        assert!(harness.engine.calls().is_empty());
        assert_eq!(
            harness.transport.to_user(ALICE),
            vec!["Searching...", "No results found for 'nothing matches'."]
        );
        let snapshot = harness.coordinator.session().snapshot();
        assert!(snapshot.search_results.is_empty());
        assert_eq!(snapshot.current_link, None);
    }

    #[tokio::test]
    async fn test_search_failure_is_reported_privately() {
        let harness = Harness::new();
        harness.provider.fail_searches("network unreachable");

        harness.run(ALICE, "/p anything").await;

        let notices = harness.transport.to_user(ALICE);
        assert_eq!(notices.len(), 2);
        assert!(notices[1].contains("network unreachable"));
        assert!(harness.transport.to_channel().is_empty());
    }

    #[tokio::test]
    async fn test_search_refused_while_playing() {
        let harness = Harness::new();
        harness.provider.with_results("first", tracks("First", 1));
        harness.provider.with_results("second", tracks("Second", 1));

        harness.run(ALICE, "/p first").await;
        harness.run(BOB, "/p second").await;

        assert_eq!(harness.engine.played().len(), 1);
        let refusal = harness.transport.to_user(BOB);
        assert_eq!(refusal.len(), 1);
        assert!(refusal[0].starts_with("The bot is already playing something"));
        assert_eq!(harness.coordinator.session().snapshot().search_results[0].title, "First 1");
    }

    #[tokio::test]
    async fn test_racing_searches_play_only_one() {
        let harness = Harness::new();
        harness.provider.with_results("first", tracks("First", 1));
        harness.provider.with_results("second", tracks("Second", 1));

        // Both pass the command-path check before either result has loaded.
        harness.coordinator.handle_text(ALICE, "/p first").await;
        harness.coordinator.handle_text(BOB, "/p second").await;
        harness.coordinator.wait_idle().await;

        let played = harness.engine.played();
        assert_eq!(played.len(), 1);
        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.search_results.len(), 1);
        assert_eq!(snapshot.current_link, Some(played[0].clone()));
        assert_eq!(snapshot.search_results[0].link, played[0]);

        let refusals: Vec<String> = [ALICE, BOB]
            .into_iter()
            .flat_map(|user| harness.transport.to_user(user))
            .filter(|notice| notice.starts_with("The bot is already playing something"))
            .collect();
        assert_eq!(refusals.len(), 1);
        assert_eq!(harness.transport.to_channel().len(), 1);
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let harness = Harness::new();
        harness.run(ALICE, "/p").await;
        assert_eq!(harness.transport.to_user(ALICE), vec!["Nothing is currently playing"]);

        harness.provider.with_results("song", tracks("Song", 1));
        harness.run(ALICE, "/p song").await;
        harness.run(BOB, "/p").await;

        assert!(harness.engine.is_paused());
        assert!(!harness.transport.voice());
        assert!(harness.transport.to_channel().contains(&"bob paused the playback".to_string()));
        assert!(harness.transport.last_status().unwrap().starts_with("Paused:"));

        harness.run(BOB, "/p").await;
        assert!(!harness.engine.is_paused());
        assert!(harness.transport.voice());
        assert!(harness.transport.last_status().unwrap().starts_with("Playing:"));
    }

    #[tokio::test]
    async fn test_stop_clears_session_but_keeps_history() {
        let harness = Harness::new();
        harness.provider.with_results("song", tracks("Song", 3));
        harness.run(ALICE, "/p song").await;

        harness.run(BOB, "/s").await;

        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.current_link, None);
        assert!(snapshot.search_results.is_empty());
        assert_eq!(snapshot.current_search_index, 0);
        assert_eq!(snapshot.phase, SwitchPhase::Idle);
        assert_eq!(harness.coordinator.session().history_entry(1).unwrap().title, "Song 1");
        assert!(!harness.transport.voice());
        assert_eq!(harness.transport.last_status().as_deref(), Some(IDLE_STATUS));
        assert!(harness.transport.to_channel().contains(&"bob stopped the playback".to_string()));

        harness.run(BOB, "/s").await;
        assert_eq!(harness.transport.to_user(BOB), vec!["Nothing is currently playing"]);
    }

    #[tokio::test]
    async fn test_volume_bounds() {
        let harness = Harness::with_settings(|settings| settings.max_volume = 80);

        harness.run(ALICE, "/v 90").await;
        assert_eq!(harness.transport.to_user(ALICE), vec!["Maximum allowed volume is 80"]);
        assert!(harness.engine.calls().is_empty());

        harness.run(ALICE, "/v 80").await;
        assert_eq!(harness.engine.calls(), vec!["volume 80"]);
        assert_eq!(harness.transport.to_channel(), vec!["alice has changed the volume to 80"]);

        harness.run(BOB, "/v").await;
        assert_eq!(harness.transport.to_user(BOB), vec!["The current volume is 80"]);
    }

    #[tokio::test]
    async fn test_get_link_only_for_network_addresses() {
        let harness = Harness::new();
        harness.run(ALICE, "/gl").await;

        harness.run(ALICE, "/u /home/alice/song.mp3").await;
        harness.run(ALICE, "/gl").await;

        harness.run(ALICE, "/u https://www.youtube.com/watch?v=abc").await;
        harness.run(CAROL, "/gl").await;

        assert_eq!(
            harness.transport.to_user(ALICE),
            vec!["Nothing is currently playing", "Nothing is currently playing"]
        );
        assert_eq!(harness.transport.to_user(CAROL), vec!["https://www.youtube.com/watch?v=abc"]);
    }

    #[tokio::test]
    async fn test_duration_report() {
        let harness = Harness::new();
        harness.run(ALICE, "/d").await;

        harness.run(ALICE, "/u https://radio.example/stream").await;
        harness.engine.set_times(200.0, 65.0);
        harness.run(ALICE, "/duration").await;

        assert_eq!(
            harness.transport.to_user(ALICE),
            vec![
                "Nothing is currently playing",
                "Total duration: 3:20. Elapsed time: 1:05. Remaining time: 2:15",
            ]
        );
    }

    #[tokio::test]
    async fn test_seek_uses_default_step() {
        let harness = Harness::with_settings(|settings| settings.seek_step = 7);
        harness.run(ALICE, "+10").await;
        assert_eq!(harness.transport.to_user(ALICE), vec!["Nothing is currently playing"]);

        harness.run(ALICE, "/u https://radio.example/stream").await;
        harness.run(ALICE, "+10").await;
        harness.run(ALICE, "-").await;
        harness.run(ALICE, "-abc").await;

        let calls = harness.engine.calls();
        assert_eq!(calls[1..], ["seek Forward 10", "seek Back 7", "seek Back 7"]);
    }

    #[tokio::test]
    async fn test_natural_end_returns_to_idle() {
        let harness = Harness::new();
        harness.run(ALICE, "/u https://radio.example/stream").await;
        assert!(harness.transport.voice());

        harness.engine.finish_track();

        assert!(!harness.transport.voice());
        assert_eq!(harness.transport.last_status().as_deref(), Some(IDLE_STATUS));
        assert_eq!(harness.coordinator.session().phase(), SwitchPhase::Idle);
    }

    #[tokio::test]
    async fn test_unknown_command_and_help() {
        let harness = Harness::new();
        harness.run(ALICE, "just chatting").await;
        assert!(harness.transport.outbound().is_empty());

        harness.run(ALICE, "/dance").await;
        harness.run(ALICE, "/help").await;

        let notices = harness.transport.to_user(ALICE);
        assert_eq!(notices.len(), 2);
        assert!(notices[0].starts_with("Unknown command 'dance'."));
        assert!(notices[1].contains("/stop (/s)"));
    }
}
