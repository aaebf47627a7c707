use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Local;
use pollview_core::{update, LiveResultState, Msg};
use pollview_engine::EngineHandle;
use pollview_logging::pv_info;

use super::effects::EffectRunner;
use super::render::render_live;
use crate::config::AppConfig;

/// Upper bound on how long the loop waits for engine events before it
/// looks at keyboard input again.
const EVENT_WAIT: Duration = Duration::from_millis(75);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Input {
    Msg(Msg),
    Quit,
}

pub fn run_live(config: &AppConfig, poll_code: &str) -> anyhow::Result<()> {
    let poll_code = poll_code.trim();
    if poll_code.is_empty() {
        bail!("Please enter a poll code.");
    }

    let engine = EngineHandle::new(config.engine_settings()).context("failed to start the IO engine")?;
    let mut shell = LiveShell::new(EffectRunner::new(engine));
    let input = spawn_input_reader();
    let mut stdout = io::stdout();
    let clear = stdout.is_terminal();

    pv_info!("Watching {}", poll_code);
    shell.dispatch(Msg::Activate {
        poll_code: poll_code.to_string(),
    });

    let mut keyboard_open = true;
    loop {
        if keyboard_open {
            match input.try_recv() {
                Ok(Input::Quit) => break,
                Ok(Input::Msg(msg)) => shell.dispatch(msg),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => keyboard_open = false,
            }
        }

        let msg = shell.runner.next_msg(EVENT_WAIT).unwrap_or(Msg::Tick);
        shell.dispatch(msg);

        if let Some(frame) = shell.take_frame() {
            draw(&mut stdout, &frame, clear)?;
        }
    }

    shell.finish();
    Ok(())
}

/// Owns the state and is the only place it changes.
struct LiveShell {
    state: LiveResultState,
    runner: EffectRunner,
    updated_at: Option<String>,
}

impl LiveShell {
    fn new(runner: EffectRunner) -> Self {
        Self {
            state: LiveResultState::new(),
            runner,
            updated_at: None,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let carries_data = matches!(
            msg,
            Msg::SnapshotPushed { .. } | Msg::FetchCompleted { result: Ok(_), .. }
        );
        let before = if carries_data {
            self.state.snapshot().cloned()
        } else {
            None
        };

        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        if carries_data && self.state.snapshot() != before.as_ref() {
            self.updated_at = Some(Local::now().format("%H:%M:%S").to_string());
        }
        self.runner.enqueue(effects);
    }

    fn take_frame(&mut self) -> Option<String> {
        if self.state.consume_dirty() {
            Some(render_live(&self.state.view(), self.updated_at.as_deref()))
        } else {
            None
        }
    }

    fn finish(mut self) {
        self.dispatch(Msg::Deactivate);
        self.runner.shutdown();
    }
}

fn spawn_input_reader() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if let Some(input) = parse_input(&line) {
                if tx.send(input).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

/// One line of keyboard input. Question numbers are 1-based.
pub(crate) fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "q" | "quit" => Some(Input::Quit),
        "n" | "next" => Some(Input::Msg(Msg::Navigate(1))),
        "p" | "prev" | "previous" => Some(Input::Msg(Msg::Navigate(-1))),
        _ => match line.parse::<usize>() {
            Ok(number) if number > 0 => Some(Input::Msg(Msg::NavigateTo(number - 1))),
            _ => None,
        },
    }
}

fn draw(out: &mut impl Write, frame: &str, clear: bool) -> io::Result<()> {
    if clear {
        write!(out, "\x1b[2J\x1b[H")?;
    } else {
        writeln!(out, "----")?;
    }
    writeln!(out, "{frame}")?;
    out.flush()
}
