use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pollview_core::PollStatus;

#[derive(Debug, Parser)]
#[command(name = "pollview", version, about = "Follow live poll results and manage polls")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand. Each one overrides its
/// `POLLVIEW_*` environment variable.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Backend base URL, e.g. http://localhost:9092/pollapi
    #[arg(long, global = true, value_name = "URL")]
    pub api_base_url: Option<String>,

    /// STOMP WebSocket endpoint (derived from the API base when omitted)
    #[arg(long, global = true, value_name = "URL")]
    pub ws_url: Option<String>,

    /// Directory for the local session and the log file
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch results update live; n/p to move, a number to jump, q to quit
    Live { code: String },
    /// Fetch and print results once
    Results {
        code: String,
        /// Print every question instead of only the first
        #[arg(long)]
        all: bool,
    },
    /// Answer a poll
    Join {
        code: String,
        /// QUESTION=ANSWER, both numbered as shown by `pollview poll`
        #[arg(long = "answer", value_name = "Q=A", value_parser = parse_answer)]
        answers: Vec<(usize, usize)>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        age: Option<String>,
    },
    /// Show a poll's questions and answers
    Poll { code: String },
    /// Sign in as an admin
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Create a poll from a RON draft file
    Create { file: PathBuf },
    /// Change a poll's status
    Status { poll_id: u64, status: PollStatus },
    /// Delete a poll
    Delete { poll_id: u64 },
    /// Show the signed-in admin's dashboard
    Dashboard,
    /// Forget the signed-in admin and the answered polls
    Reset,
}

fn parse_answer(raw: &str) -> Result<(usize, usize), String> {
    let (question, answer) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=ANSWER, got '{raw}'"))?;
    let number = |part: &str| {
        part.trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("'{}' is not a positive number", part.trim()))
    };
    Ok((number(question)?, number(answer)?))
}
