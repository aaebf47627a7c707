//! Plain-text rendering of view models. Pure functions returning `String`
//! so the output can be asserted on.

use std::fmt::Write;

use pollview_core::{
    AdminDashboard, ConnectionState, LiveResultView, PollDefinition, PollResultSnapshot,
    PollResultsView, QuestionView, ResultDisplay,
};

const BAR_WIDTH: usize = 30;

pub fn render_live(view: &LiveResultView, updated_at: Option<&str>) -> String {
    let mut out = String::new();
    let code = view.poll_code.as_deref().unwrap_or("-");
    let connection = match view.connection {
        ConnectionState::Connected => view.live_label(),
        ConnectionState::Connecting => "CONNECTING",
        ConnectionState::Disconnected => view.live_label(),
    };
    let _ = write!(out, "[{connection}] {code}");
    if let Some(at) = updated_at {
        let _ = write!(out, "  updated {at}");
    }
    out.push('\n');
    if let Some(reason) = &view.channel_error {
        let _ = writeln!(out, "Live updates unavailable: {reason}");
    }
    out.push('\n');

    match &view.display {
        ResultDisplay::Idle => out.push_str("No poll selected.\n"),
        ResultDisplay::Loading => out.push_str("Loading results...\n"),
        ResultDisplay::Unavailable => out.push_str("Results are not available for this poll.\n"),
        ResultDisplay::Ready(results) => {
            out.push_str(&render_results(results));
            out.push('\n');
            out.push_str(&navigation_hint(results));
        }
    }
    out
}

pub fn render_results(view: &PollResultsView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "Total responses: {}", view.total_responses);
    if view.question_count == 0 {
        out.push_str("\nThis poll has no questions.\n");
        return out;
    }
    let _ = writeln!(
        out,
        "\nQuestion {} of {}",
        view.question_index + 1,
        view.question_count
    );
    if let Some(question) = &view.question {
        out.push_str(&render_question(question));
    }
    out
}

/// Every question of a snapshot, for one-shot output.
pub fn render_snapshot(snapshot: &PollResultSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", snapshot.title);
    let _ = writeln!(out, "Total responses: {}", snapshot.total_responses);
    for (index, question) in snapshot.question_results.iter().enumerate() {
        let _ = writeln!(out, "\nQuestion {} of {}", index + 1, snapshot.question_count());
        out.push_str(&render_question(&QuestionView::from_result(question)));
    }
    out
}

fn render_question(question: &QuestionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", question.text);
    let width = question
        .answers
        .iter()
        .map(|a| a.text.chars().count())
        .max()
        .unwrap_or(0);
    for answer in &question.answers {
        let _ = writeln!(
            out,
            "  {:<width$}  {:<bar_width$}  {:>4}  {:>5.1}%",
            answer.text,
            bar(answer.bar_fraction),
            answer.response_count,
            answer.percentage,
            bar_width = BAR_WIDTH,
        );
    }
    out
}

fn navigation_hint(view: &PollResultsView) -> String {
    let mut keys = Vec::new();
    if view.can_go_back {
        keys.push("p: previous");
    }
    if view.can_go_forward {
        keys.push("n: next");
    }
    if view.question_count > 1 {
        keys.push("1-9: jump");
    }
    keys.push("q: quit");
    keys.join("  ")
}

fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled)
}

pub fn render_poll(poll: &PollDefinition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", poll.title, poll.poll_code);
    if let Some(status) = poll.status() {
        let _ = writeln!(out, "Status: {status}");
    }
    let demographics: Vec<_> = poll.demographics().iter().map(|d| d.as_str()).collect();
    if !demographics.is_empty() {
        let _ = writeln!(out, "Asks for: {}", demographics.join(", "));
    }
    for (q_index, question) in poll.ordered_questions().into_iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", q_index + 1, question.text);
        for (a_index, answer) in question.ordered_answers().into_iter().enumerate() {
            let _ = writeln!(out, "   {}) {}", a_index + 1, answer.text);
        }
    }
    out
}

pub fn render_dashboard(username: &str, dashboard: &AdminDashboard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dashboard for {username}");
    let _ = writeln!(
        out,
        "Polls: {}  Active: {}  Questions: {}",
        dashboard.total_polls, dashboard.active_polls, dashboard.total_questions
    );
    if !dashboard.recent_polls.is_empty() {
        out.push_str("\nRecent polls:\n");
        for poll in &dashboard.recent_polls {
            let status = poll
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(
                out,
                "  #{:<5} {:<12} {:<10} {:>5} responses  {}",
                poll.id, poll.poll_code, status, poll.total_responses, poll.title
            );
        }
    }
    out
}
