use crate::{Effect, LiveResultState, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Every writer of the snapshot slot (the one-shot fetch, the live channel
/// and the user) funnels through here, so callers that drive it from a single
/// loop get arrival-order, last-write-wins semantics without locking.
pub fn update(mut state: LiveResultState, msg: Msg) -> (LiveResultState, Vec<Effect>) {
    let effects = match msg {
        Msg::Activate { poll_code } => {
            let poll_code = poll_code.trim();
            if poll_code.is_empty() {
                return (state, Vec::new());
            }
            let (activation, previous) = state.activate(poll_code);
            let mut effects = Vec::with_capacity(3);
            if let Some(previous) = previous {
                effects.push(Effect::Unsubscribe {
                    activation: previous,
                });
            }
            effects.push(Effect::FetchResults {
                activation,
                poll_code: poll_code.to_string(),
            });
            effects.push(Effect::Subscribe {
                activation,
                poll_code: poll_code.to_string(),
            });
            effects
        }
        Msg::Deactivate => match state.deactivate() {
            Some(activation) => vec![Effect::Unsubscribe { activation }],
            None => Vec::new(),
        },
        Msg::FetchCompleted { activation, result } => {
            match result {
                Ok(snapshot) => state.apply_fetch_success(activation, snapshot),
                Err(failure) => state.apply_fetch_failure(activation, failure),
            }
            Vec::new()
        }
        Msg::SnapshotPushed {
            activation,
            snapshot,
        } => {
            state.apply_pushed(activation, snapshot);
            Vec::new()
        }
        Msg::ChannelStatusChanged { activation, status } => {
            state.apply_status(activation, status);
            Vec::new()
        }
        Msg::ChannelFailed { activation, reason } => {
            state.apply_channel_failure(activation, reason);
            Vec::new()
        }
        Msg::Navigate(delta) => {
            state.navigate(delta);
            Vec::new()
        }
        Msg::NavigateTo(index) => {
            state.navigate_to(index);
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}
