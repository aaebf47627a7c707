use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Every poll code issued by the backend starts with this prefix.
pub const POLL_CODE_PREFIX: &str = "poll";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Please enter a poll code.")]
    Empty,
    #[error("Invalid poll code. Poll codes must start with 'poll'.")]
    InvalidCode,
    #[error("You have already voted in this poll.")]
    AlreadyVoted,
}

/// Client-side state that outlives a single command: the signed-in admin and
/// the polls this client already answered.
///
/// Created on start (usually via [`ClientSession::restore`]), cleared by
/// [`ClientSession::sign_out`] for the admin part and [`ClientSession::reset`]
/// for everything. The vote list is advisory; the backend does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientSession {
    admin: Option<AdminIdentity>,
    voted_polls: BTreeSet<String>,
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(
        admin: Option<AdminIdentity>,
        voted_polls: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            admin,
            voted_polls: voted_polls.into_iter().collect(),
        }
    }

    pub fn admin(&self) -> Option<&AdminIdentity> {
        self.admin.as_ref()
    }

    pub fn sign_in(&mut self, admin: AdminIdentity) {
        self.admin = Some(admin);
    }

    pub fn sign_out(&mut self) -> Option<AdminIdentity> {
        self.admin.take()
    }

    pub fn reset(&mut self) {
        self.admin = None;
        self.voted_polls.clear();
    }

    pub fn voted_polls(&self) -> impl Iterator<Item = &str> {
        self.voted_polls.iter().map(String::as_str)
    }

    pub fn has_voted(&self, poll_code: &str) -> bool {
        self.voted_polls.contains(poll_code)
    }

    /// Returns `false` when the code was already recorded.
    pub fn record_vote(&mut self, poll_code: &str) -> bool {
        self.voted_polls.insert(poll_code.to_string())
    }

    /// Checks a user-typed poll code before joining; returns the trimmed code.
    pub fn check_join(&self, raw: &str) -> Result<String, JoinError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(JoinError::Empty);
        }
        let has_prefix = code
            .get(..POLL_CODE_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(POLL_CODE_PREFIX));
        if !has_prefix {
            return Err(JoinError::InvalidCode);
        }
        if self.has_voted(code) {
            return Err(JoinError::AlreadyVoted);
        }
        Ok(code.to_string())
    }
}
