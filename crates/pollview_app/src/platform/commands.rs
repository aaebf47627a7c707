//! One-shot subcommands: everything except `live`.

use std::fs;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use pollview_core::{
    AdminIdentity, ClientSession, Demographics, JoinError, PollDefinition, PollDraft, PollId,
    PollResultsView, PollStatus, ResponseDraft, SubmitResponseRequest,
};
use pollview_engine::PollApi;
use pollview_logging::pv_warn;
use tokio::runtime::Runtime;

use super::persistence::{clear_session, load_session, save_session};
use super::render::{render_dashboard, render_poll, render_results, render_snapshot};
use crate::config::AppConfig;

pub(crate) struct CommandContext {
    config: AppConfig,
    runtime: Runtime,
    api: PollApi,
    session: ClientSession,
}

impl CommandContext {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let api = PollApi::new(config.engine_settings().api)?;
        Ok(Self {
            session: load_session(&config.state_dir),
            config: config.clone(),
            runtime,
            api,
        })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn save(&self) {
        save_session(&self.config.state_dir, &self.session);
    }

    fn admin(&self) -> anyhow::Result<AdminIdentity> {
        self.session
            .admin()
            .cloned()
            .ok_or_else(|| anyhow!("Please log in first (pollview login <USERNAME>)"))
    }

    pub fn results(&self, poll_code: &str, all: bool) -> anyhow::Result<String> {
        let snapshot = self.block_on(self.api.results(poll_code))?;
        if all {
            Ok(render_snapshot(&snapshot))
        } else {
            Ok(render_results(&PollResultsView::project(&snapshot, 0)))
        }
    }

    pub fn poll(&self, poll_code: &str) -> anyhow::Result<String> {
        let poll = self.block_on(self.api.poll_by_code(poll_code))?;
        Ok(render_poll(&poll))
    }

    pub fn join(
        &mut self,
        raw_code: &str,
        answers: &[(usize, usize)],
        demographics: Demographics,
    ) -> anyhow::Result<String> {
        let typed_code = self.session.check_join(raw_code)?;
        let poll = self.block_on(self.api.poll_by_code(&typed_code))?;
        let request = prepare_submission(&self.session, &poll, answers, demographics)?;
        self.block_on(self.api.submit_response(&request))?;

        // Votes are keyed by the backend's spelling of the code.
        self.session.record_vote(&poll.poll_code);
        self.save();

        let mut out = format!("Thank you! Your response to '{}' was recorded.\n", poll.title);
        if poll.allow_view_results {
            match self.block_on(self.api.results(&poll.poll_code)) {
                Ok(snapshot) => {
                    out.push('\n');
                    out.push_str(&render_snapshot(&snapshot));
                }
                Err(err) => pv_warn!("Could not load results after voting: {}", err),
            }
        }
        Ok(out)
    }

    pub fn login(&mut self, username: &str, password: Option<String>) -> anyhow::Result<String> {
        let password = match password {
            Some(password) => password,
            None => prompt_password()?,
        };
        let admin = self.block_on(self.api.login(username, &password))?;
        let message = format!("Signed in as {}.", admin.username);
        self.session.sign_in(admin);
        self.save();
        Ok(message)
    }

    pub fn logout(&mut self) -> anyhow::Result<String> {
        let Some(admin) = self.session.sign_out() else {
            return Ok("Not signed in.".to_string());
        };
        // The backend session belongs to the process that logged in; this
        // call only helps when the cookie is still valid.
        if let Err(err) = self.block_on(self.api.logout()) {
            pv_warn!("Backend logout failed: {}", err);
        }
        self.save();
        Ok(format!("Signed out {}.", admin.username))
    }

    pub fn create(&self, file: &Path) -> anyhow::Result<String> {
        let admin = self.admin()?;
        let text = fs::read_to_string(file)
            .with_context(|| format!("cannot read poll draft {}", file.display()))?;
        let draft: PollDraft = ron::from_str(&text)
            .with_context(|| format!("{} is not a valid poll draft", file.display()))?;
        let request = draft.into_request()?;

        let created = self.block_on(self.api.create_poll(admin.id, &request))?;
        let mut out = format!(
            "Created '{}' (id {}). Poll code: {}\n",
            created.title, created.id, created.poll_code
        );
        if let Some(link) = &created.share_link {
            out.push_str(&format!("Share link: {link}\n"));
        }
        Ok(out)
    }

    pub fn status(&self, poll_id: PollId, status: PollStatus) -> anyhow::Result<String> {
        self.admin()?;
        let updated = self.block_on(self.api.update_status(poll_id, status))?;
        let now = updated.status().unwrap_or(status);
        Ok(format!("Poll {} ({}) is now {}.", updated.id, updated.poll_code, now))
    }

    pub fn delete(&self, poll_id: PollId) -> anyhow::Result<String> {
        self.admin()?;
        self.block_on(self.api.delete_poll(poll_id))?;
        Ok(format!("Deleted poll {poll_id}."))
    }

    pub fn dashboard(&self) -> anyhow::Result<String> {
        let admin = self.admin()?;
        let dashboard = self.block_on(self.api.dashboard(admin.id))?;
        Ok(render_dashboard(&admin.username, &dashboard))
    }

    pub fn reset(&mut self) -> anyhow::Result<String> {
        self.session.reset();
        clear_session(&self.config.state_dir);
        Ok("Local session cleared.".to_string())
    }
}

/// Local checks before a response is sent: the poll must still be open,
/// not answered already, and fully answered.
pub(crate) fn prepare_submission(
    session: &ClientSession,
    poll: &PollDefinition,
    answers: &[(usize, usize)],
    demographics: Demographics,
) -> anyhow::Result<SubmitResponseRequest> {
    if let Some(status) = poll.status().filter(|s| *s != PollStatus::Active) {
        bail!("This poll is {status} and no longer accepts responses.");
    }
    if session.has_voted(&poll.poll_code) {
        return Err(JoinError::AlreadyVoted.into());
    }
    let mut draft = select_answers(poll, answers)?;
    draft.demographics = demographics;
    Ok(draft.validate(poll)?)
}

/// Maps 1-based `(question, answer)` positions, in display order, to ids.
pub(crate) fn select_answers(
    poll: &PollDefinition,
    answers: &[(usize, usize)],
) -> anyhow::Result<ResponseDraft> {
    let questions = poll.ordered_questions();
    let mut draft = ResponseDraft::new();
    for &(q, a) in answers {
        let question = q
            .checked_sub(1)
            .and_then(|index| questions.get(index))
            .ok_or_else(|| {
                anyhow!(
                    "Question {q} does not exist; this poll has {} questions",
                    questions.len()
                )
            })?;
        let options = question.ordered_answers();
        let answer = a
            .checked_sub(1)
            .and_then(|index| options.get(index))
            .ok_or_else(|| {
                anyhow!(
                    "Question {q} has no answer {a}; pick 1 to {}",
                    options.len()
                )
            })?;
        draft.select(question.id, answer.id);
    }
    Ok(draft)
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
