pub mod app;
mod commands;
mod effects;
pub mod logging;
mod persistence;
mod render;

use pollview_core::Demographics;

use crate::cli::Command;
use crate::config::AppConfig;
use commands::CommandContext;

pub fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    let context = || CommandContext::new(config);
    let output = match command {
        Command::Live { code } => return app::run_live(config, &code),
        Command::Results { code, all } => context()?.results(&code, all)?,
        Command::Join {
            code,
            answers,
            name,
            gender,
            age,
        } => context()?.join(&code, &answers, Demographics { name, gender, age })?,
        Command::Poll { code } => context()?.poll(&code)?,
        Command::Login { username, password } => context()?.login(&username, password)?,
        Command::Logout => context()?.logout()?,
        Command::Create { file } => context()?.create(&file)?,
        Command::Status { poll_id, status } => context()?.status(poll_id, status)?,
        Command::Delete { poll_id } => context()?.delete(poll_id)?,
        Command::Dashboard => context()?.dashboard()?,
        Command::Reset => context()?.reset()?,
    };

    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
    Ok(())
}
