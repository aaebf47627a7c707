use std::sync::Once;

use pollview_core::{
    update, ActivationId, AnswerResult, ConnectionState, Effect, FetchFailure, LiveResultState,
    Msg, PollResultSnapshot, QuestionResult, ResultDisplay, LIVE_LABEL, OFFLINE_LABEL,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pollview_logging::initialize_for_tests);
}

fn snapshot(total_responses: u64, counts: &[&[u64]]) -> PollResultSnapshot {
    let question_results = counts
        .iter()
        .zip(1u64..)
        .map(|(answers, question_id)| {
            let sum: u64 = answers.iter().sum();
            QuestionResult {
                question_id,
                question_text: format!("Question {question_id}"),
                answer_results: answers
                    .iter()
                    .zip(1u64..)
                    .map(|(&count, answer_id)| AnswerResult {
                        answer_id,
                        answer_text: format!("Answer {answer_id}"),
                        response_count: count,
                        percentage: if sum == 0 {
                            0.0
                        } else {
                            count as f64 * 100.0 / sum as f64
                        },
                    })
                    .collect(),
            }
        })
        .collect();
    PollResultSnapshot {
        poll_id: 1,
        title: "Team lunch".to_string(),
        chart_type: None,
        total_responses,
        question_results,
    }
}

fn activate(state: LiveResultState, poll_code: &str) -> (LiveResultState, ActivationId) {
    let (state, effects) = update(
        state,
        Msg::Activate {
            poll_code: poll_code.to_string(),
        },
    );
    let activation = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Subscribe { activation, .. } => Some(*activation),
            _ => None,
        })
        .expect("subscribe effect");
    (state, activation)
}

fn fetched(
    state: LiveResultState,
    activation: ActivationId,
    snapshot: PollResultSnapshot,
) -> LiveResultState {
    update(
        state,
        Msg::FetchCompleted {
            activation,
            result: Ok(snapshot),
        },
    )
    .0
}

fn pushed(
    state: LiveResultState,
    activation: ActivationId,
    snapshot: PollResultSnapshot,
) -> LiveResultState {
    update(
        state,
        Msg::SnapshotPushed {
            activation,
            snapshot,
        },
    )
    .0
}

fn status(
    state: LiveResultState,
    activation: ActivationId,
    status: ConnectionState,
) -> (LiveResultState, Vec<Effect>) {
    update(state, Msg::ChannelStatusChanged { activation, status })
}

#[test]
fn activate_requests_fetch_and_subscription() {
    init_logging();
    let (state, effects) = update(
        LiveResultState::new(),
        Msg::Activate {
            poll_code: " poll42 ".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![
            Effect::FetchResults {
                activation: 1,
                poll_code: "poll42".to_string(),
            },
            Effect::Subscribe {
                activation: 1,
                poll_code: "poll42".to_string(),
            },
        ]
    );
    let view = state.view();
    assert_eq!(view.poll_code.as_deref(), Some("poll42"));
    assert_eq!(view.connection, ConnectionState::Connecting);
    assert_eq!(view.display, ResultDisplay::Loading);
    assert_eq!(view.live_label(), OFFLINE_LABEL);
}

#[test]
fn fetch_without_channel_messages_is_displayed() {
    init_logging();
    let (state, activation) = activate(LiveResultState::new(), "poll1");
    let expected = snapshot(10, &[&[7, 3]]);

    let state = fetched(state, activation, expected.clone());

    assert_eq!(state.snapshot(), Some(&expected));
    match state.view().display {
        ResultDisplay::Ready(results) => {
            assert_eq!(results.total_responses, 10);
            assert_eq!(results.question_count, 1);
        }
        other => panic!("expected ready display, got {other:?}"),
    }
}

#[test]
fn late_fetch_does_not_clobber_streamed_snapshot() {
    init_logging();
    let (state, activation) = activate(LiveResultState::new(), "poll1");
    let first_push = snapshot(11, &[&[8, 3]]);
    let second_push = snapshot(12, &[&[8, 4]]);
    let slow_fetch = snapshot(10, &[&[7, 3]]);

    let state = pushed(state, activation, first_push);
    let state = pushed(state, activation, second_push.clone());
    let state = fetched(state, activation, slow_fetch);

    assert_eq!(state.snapshot(), Some(&second_push));
}

#[test]
fn streamed_snapshots_replace_an_earlier_fetch() {
    init_logging();
    let (state, activation) = activate(LiveResultState::new(), "poll1");
    let pushes = [
        snapshot(11, &[&[8, 3]]),
        snapshot(12, &[&[8, 4]]),
        snapshot(13, &[&[9, 4]]),
    ];

    let mut state = fetched(state, activation, snapshot(10, &[&[7, 3]]));
    for push in &pushes {
        state = pushed(state, activation, push.clone());
        assert_eq!(state.snapshot(), Some(push));
    }
}

#[test]
fn late_results_after_deactivate_are_ignored() {
    init_logging();
    let (state, activation) = activate(LiveResultState::new(), "poll1");
    let state = fetched(state, activation, snapshot(10, &[&[7, 3]]));
    let (state, _) = status(state, activation, ConnectionState::Connected);

    let (mut state, effects) = update(state, Msg::Deactivate);
    assert_eq!(effects, vec![Effect::Unsubscribe { activation }]);
    assert_eq!(state.connection(), ConnectionState::Disconnected);
    assert!(state.consume_dirty());
    let torn_down = state.clone();

    let state = fetched(state, activation, snapshot(99, &[&[90, 9]]));
    let state = pushed(state, activation, snapshot(98, &[&[90, 8]]));
    let (state, effects) = status(state, activation, ConnectionState::Connected);
    let (mut state, _) = update(
        state,
        Msg::ChannelFailed {
            activation,
            reason: "closed".into(),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    assert_eq!(state, torn_down);
    // The last known snapshot stays visible after teardown.
    assert_eq!(state.snapshot().map(|s| s.total_responses), Some(10));
}

#[test]
fn second_deactivate_is_noop() {
    init_logging();
    let (state, _) = activate(LiveResultState::new(), "poll1");
    let (state, _) = update(state, Msg::Deactivate);
    let (next, effects) = update(state.clone(), Msg::Deactivate);
    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn fetch_failure_without_snapshot_is_unavailable_until_a_push() {
    init_logging();
    for failure in [
        FetchFailure::NotFound {
            message: "poll not found".into(),
        },
        FetchFailure::Transport {
            message: "timeout".into(),
        },
    ] {
        let (state, activation) = activate(LiveResultState::new(), "poll1");
        let (state, _) = update(
            state,
            Msg::FetchCompleted {
                activation,
                result: Err(failure),
            },
        );
        assert_eq!(state.view().display, ResultDisplay::Unavailable);

        let state = pushed(state, activation, snapshot(1, &[&[1, 0]]));
        assert!(matches!(state.view().display, ResultDisplay::Ready(_)));
    }
}

#[test]
fn fetch_failure_after_push_is_swallowed() {
    init_logging();
    let (state, activation) = activate(LiveResultState::new(), "poll1");
    let live = snapshot(4, &[&[3, 1]]);
    let state = pushed(state, activation, live.clone());

    let (state, _) = update(
        state,
        Msg::FetchCompleted {
            activation,
            result: Err(FetchFailure::Transport {
                message: "connection reset".into(),
            }),
        },
    );

    assert_eq!(state.snapshot(), Some(&live));
    assert!(matches!(state.view().display, ResultDisplay::Ready(_)));
}

#[test]
fn channel_connect_then_disconnect_without_reconnect() {
    init_logging();
    let (state, activation) = activate(LiveResultState::new(), "poll1");

    let (state, effects) = status(state, activation, ConnectionState::Connected);
    assert!(effects.is_empty());
    assert_eq!(state.connection(), ConnectionState::Connected);
    assert_eq!(state.view().live_label(), LIVE_LABEL);

    let (state, effects) = status(state, activation, ConnectionState::Disconnected);
    assert!(effects.is_empty());
    assert_eq!(state.connection(), ConnectionState::Disconnected);
    assert_eq!(state.view().live_label(), OFFLINE_LABEL);

    // Nothing brings the channel back on its own.
    let (state, effects) = update(state, Msg::Tick);
    assert!(effects.is_empty());
    assert_eq!(state.connection(), ConnectionState::Disconnected);
}

#[test]
fn channel_failure_degrades_to_offline_and_keeps_fetched_snapshot() {
    init_logging();
    let (state, activation) = activate(LiveResultState::new(), "poll1");
    let initial = snapshot(10, &[&[7, 3]]);
    let state = fetched(state, activation, initial.clone());

    let (state, effects) = update(
        state,
        Msg::ChannelFailed {
            activation,
            reason: "handshake timed out".into(),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.connection, ConnectionState::Disconnected);
    assert_eq!(view.live_label(), OFFLINE_LABEL);
    assert_eq!(view.channel_error.as_deref(), Some("handshake timed out"));
    assert_eq!(state.snapshot(), Some(&initial));
}

#[test]
fn switching_polls_tears_down_and_resets() {
    init_logging();
    let (state, first) = activate(LiveResultState::new(), "poll1");
    let state = fetched(state, first, snapshot(3, &[&[1, 1], &[1, 0], &[0, 1]]));
    let (state, _) = update(state, Msg::Navigate(2));
    assert_eq!(state.cursor(), 2);

    let (state, effects) = update(
        state,
        Msg::Activate {
            poll_code: "poll2".into(),
        },
    );
    let second = first + 1;
    assert_eq!(
        effects,
        vec![
            Effect::Unsubscribe { activation: first },
            Effect::FetchResults {
                activation: second,
                poll_code: "poll2".into(),
            },
            Effect::Subscribe {
                activation: second,
                poll_code: "poll2".into(),
            },
        ]
    );
    assert_eq!(state.cursor(), 0);
    assert!(state.snapshot().is_none());
    assert_eq!(state.view().display, ResultDisplay::Loading);

    // Stragglers from the first activation are dropped.
    let state = pushed(state, first, snapshot(50, &[&[25, 25]]));
    assert!(state.snapshot().is_none());
}

#[test]
fn reactivating_same_poll_keeps_cursor_and_snapshot() {
    init_logging();
    let (state, first) = activate(LiveResultState::new(), "poll1");
    let state = fetched(state, first, snapshot(3, &[&[1, 1], &[1, 0]]));
    let (state, _) = update(state, Msg::Navigate(1));

    let (state, second) = activate(state, "poll1");
    assert_ne!(first, second);
    assert_eq!(state.cursor(), 1);
    assert!(state.snapshot().is_some());
}

#[test]
fn percentages_of_a_question_sum_to_one_hundred() {
    let json = r#"{
        "pollId": 1,
        "title": "Team lunch",
        "totalResponses": 10,
        "questionResults": [{
            "questionId": 1,
            "questionText": "Where?",
            "answerResults": [
                {"answerId": 1, "answerText": "Cafe", "responseCount": 7, "percentage": 70.0},
                {"answerId": 2, "answerText": "Park", "responseCount": 3, "percentage": 30.0}
            ]
        }]
    }"#;
    let snapshot: PollResultSnapshot = serde_json::from_str(json).unwrap();

    let question = &snapshot.question_results[0];
    assert!((question.percentage_total() - 100.0).abs() <= 0.1);
    assert_eq!(question.total_count(), snapshot.total_responses);
}

#[test]
fn dirty_is_only_set_by_visible_changes() {
    init_logging();
    let (mut state, activation) = activate(LiveResultState::new(), "poll1");
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());

    let (mut state, _) = status(state, activation, ConnectionState::Connecting);
    assert!(!state.consume_dirty());

    let (mut state, _) = status(state, activation, ConnectionState::Connected);
    assert!(state.consume_dirty());

    let mut state = pushed(state, activation, snapshot(1, &[&[1, 0]]));
    assert!(state.consume_dirty());

    let (mut state, _) = update(state, Msg::Navigate(1));
    assert!(!state.consume_dirty());
}
