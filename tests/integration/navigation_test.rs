//! Integration tests for search-result navigation, history replay and the
//! end-of-track guard around explicit switches.

use crate::test_utils::constants::*;
use crate::test_utils::{tracks, Harness, Outbound};
use r_playbot::coordinator::SwitchPhase;

#[cfg(test)]
mod navigation_integration_tests {
    use super::*;

    async fn searched(count: usize) -> Harness {
        let harness = Harness::new();
        harness.provider.with_results("song", tracks("Song", count));
        harness.run(ALICE, "/p song").await;
        harness
    }

    #[tokio::test]
    async fn test_next_and_previous_walk_the_results() {
        let harness = searched(3).await;
        let results = tracks("Song", 3);

        harness.run(ALICE, "/n").await;
        assert_eq!(harness.coordinator.session().snapshot().current_search_index, 1);
        assert_eq!(
            harness.coordinator.session().current_link(),
            Some(results[1].link.clone())
        );

        harness.run(BOB, "/previous").await;
        assert_eq!(harness.coordinator.session().snapshot().current_search_index, 0);

        assert_eq!(
            harness.engine.calls(),
            vec![
                format!("play {}", results[0].link),
                "stop".to_string(),
                format!("play {}", results[1].link),
                "stop".to_string(),
                format!("play {}", results[0].link),
            ]
        );
        assert!(harness.transport.to_user(ALICE).contains(&"Playing: Song 2".to_string()));
        assert_eq!(harness.transport.to_user(BOB), vec!["Playing: Song 1"]);
    }

    #[tokio::test]
    async fn test_navigation_bounds_are_refused() {
        let harness = Harness::new();
        harness.run(ALICE, "/n").await;
        assert_eq!(harness.transport.to_user(ALICE), vec!["No search results to play from."]);

        let harness = searched(2).await;
        harness.run(BOB, "/b").await;
        harness.run(BOB, "/n").await;
        harness.run(BOB, "/n").await;

        assert_eq!(
            harness.transport.to_user(BOB),
            vec![
                "You are at the beginning of results.",
                "Playing: Song 2",
                "You've reached the end of results.",
            ]
        );
        // Refusals leave the engine alone: one search load, one stop, one switch load.
        assert_eq!(harness.engine.calls().len(), 3);
        assert_eq!(harness.coordinator.session().snapshot().current_search_index, 1);
    }

    #[tokio::test]
    async fn test_stop_notification_during_switch_is_ignored() {
        let harness = searched(3).await;
        harness.engine.notify_on_stop(true);

        harness.run(ALICE, "/n").await;

        // The stop inside the switch fired the engine callback; the session stayed on the new track.
        assert!(harness.transport.voice());
        let expected = format!("Playing: {}", tracks("Song", 3)[1].link);
        assert_eq!(harness.transport.last_status(), Some(expected));
        assert_eq!(harness.coordinator.session().phase(), SwitchPhase::Steady);
        assert!(!harness
            .transport
            .outbound()
            .iter()
            .any(|message| *message == Outbound::Status(IDLE_STATUS.to_string())));

        harness.engine.finish_track();
        assert!(!harness.transport.voice());
        assert_eq!(harness.transport.last_status().as_deref(), Some(IDLE_STATUS));
        assert_eq!(harness.coordinator.session().phase(), SwitchPhase::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_switches_do_not_interleave() {
        let harness = searched(4).await;
        let results = tracks("Song", 4);

        // Submit three steps back to back, then wait for all of them.
        for _ in 0..3 {
            harness.coordinator.handle_text(ALICE, "/n").await;
        }
        harness.coordinator.wait_idle().await;

        let calls = harness.engine.calls();
        let mut expected = vec![format!("play {}", results[0].link)];
        for track in &results[1..] {
            expected.push("stop".to_string());
            expected.push(format!("play {}", track.link));
        }
        assert_eq!(calls, expected);

        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.current_search_index, 3);
        assert_eq!(snapshot.current_link, Some(results[3].link.clone()));
        assert_eq!(snapshot.phase, SwitchPhase::Steady);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mixed_steps_stay_within_results() {
        let harness = searched(3).await;
        let results = tracks("Song", 3);
        let searched_notices = harness.transport.to_user(ALICE).len();

        // Nine steps over three results: some must be refused whatever order they run in.
        for line in ["/n", "/b", "/n", "/n", "/b", "/n", "/n", "/b", "/b"] {
            let user = if line == "/n" { ALICE } else { BOB };
            harness.coordinator.handle_text(user, line).await;
        }
        harness.coordinator.wait_idle().await;

        let alice: Vec<String> = harness.transport.to_user(ALICE).split_off(searched_notices);
        let bob = harness.transport.to_user(BOB);
        let admitted = |notices: &[String]| notices.iter().filter(|notice| notice.starts_with("Playing:")).count();
        let (forward, back) = (admitted(&alice), admitted(&bob));
        let refused: Vec<&String> = alice
            .iter()
            .chain(bob.iter())
            .filter(|notice| !notice.starts_with("Playing:"))
            .collect();
        assert_eq!(forward + back + refused.len(), 9);
        assert!(refused.iter().all(|notice| {
            notice.as_str() == "You've reached the end of results." || notice.as_str() == "You are at the beginning of results."
        }));

        assert!(forward >= back);
        let index = forward - back;
        assert!(index < results.len());
        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.current_search_index, index);
        assert_eq!(snapshot.current_link, Some(results[index].link.clone()));
        assert_eq!(snapshot.phase, SwitchPhase::Steady);

        let calls = harness.engine.calls();
        assert_eq!(calls.iter().filter(|call| *call == "stop").count(), forward + back);
        assert_eq!(harness.engine.played().len(), 1 + forward + back);
    }

    #[tokio::test]
    async fn test_stop_during_switch_waits_for_the_load() {
        let harness = searched(2).await;
        harness.engine.hold_loads();

        harness.coordinator.handle_text(ALICE, "/n").await;
        while harness.engine.played().len() < 2 {
            tokio::task::yield_now().await;
        }

        // The old track is already stopped here; the stop request must wait, not refuse.
        tokio::join!(harness.coordinator.handle_text(BOB, "/s"), async {
            tokio::task::yield_now().await;
            harness.engine.release_loads();
        });
        harness.coordinator.wait_idle().await;

        assert!(harness.transport.to_user(BOB).is_empty());
        assert_eq!(harness.engine.calls().last().map(String::as_str), Some("stop"));
        assert!(harness.transport.to_channel().contains(&"bob stopped the playback".to_string()));
        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.current_link, None);
        assert_eq!(snapshot.phase, SwitchPhase::Idle);
        assert!(!harness.transport.voice());
        assert_eq!(harness.transport.last_status().as_deref(), Some(IDLE_STATUS));
    }

    #[tokio::test]
    async fn test_failed_switch_leaves_session_idle() {
        let harness = searched(2).await;
        harness.engine.fail_link(&tracks("Song", 2)[1].link);

        harness.run(ALICE, "/n").await;

        let snapshot = harness.coordinator.session().snapshot();
        assert_eq!(snapshot.phase, SwitchPhase::Idle);
        assert_eq!(snapshot.current_link, None);
        assert_eq!(snapshot.current_search_index, 1);
        assert!(!harness.transport.voice());
        assert_eq!(harness.transport.last_status().as_deref(), Some(IDLE_STATUS));
        assert!(harness.transport.to_user(ALICE).last().unwrap().starts_with("Playback error:"));

        // A natural end after the failure is harmless.
        harness.engine.finish_track();
        assert_eq!(harness.coordinator.session().phase(), SwitchPhase::Idle);
    }

    #[tokio::test]
    async fn test_history_listing_and_replay() {
        let harness = Harness::new();
        harness.run(ALICE, "/r").await;
        assert_eq!(harness.transport.to_user(ALICE), vec!["No tracks have been played yet."]);

        let harness = searched(5).await;
        for _ in 0..4 {
            harness.run(ALICE, "/n").await;
        }
        harness.run(BOB, "/r").await;
        assert_eq!(
            harness.transport.to_user(BOB),
            vec![
                "1. Song 5\n2. Song 4\n3. Song 3\n4. Song 2",
                "5. Song 1",
            ]
        );

        harness.run(BOB, "/r 4").await;
        assert!(harness
            .transport
            .to_channel()
            .contains(&"bob requested to play Song 2 from history".to_string()));
        assert_eq!(harness.coordinator.session().history_entry(1).unwrap().title, "Song 2");
        assert_eq!(harness.coordinator.session().phase(), SwitchPhase::Steady);

        harness.run(BOB, "/r 9").await;
        assert!(harness.transport.to_user(BOB).last().unwrap().contains("There is no history entry 9"));
    }

    #[tokio::test]
    async fn test_history_capacity_drops_oldest() {
        let harness = Harness::with_settings(|settings| settings.history_capacity = 2);
        for n in 1..=3 {
            harness.run(ALICE, &format!("/u https://radio.example/{}", n)).await;
        }
        let session = harness.coordinator.session();
        assert_eq!(session.history_entry(1).unwrap().link, "https://radio.example/3");
        assert_eq!(session.history_entry(2).unwrap().link, "https://radio.example/2");
        assert_eq!(session.history_entry(3), None);
    }
}
