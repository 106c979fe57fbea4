//! The interactive session loop.
//!
//! Reads queries line by line, keeps the conversation history across
//! turns, and supports a few local commands: `/clear` resets the
//! history, `/history` shows what will be sent to the model, and
//! `exit`/`quit` leave the session.

use crate::App;
use salespilot_agent::prompt::system_prompt;
use salespilot_agent::SessionHistory;
use salespilot_config::AppConfig;
use salespilot_core::message::Message;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub(crate) async fn run(app: &App, config: &AppConfig) -> anyhow::Result<()> {
    let mut history = SessionHistory::new(config.history.max_messages, config.history.max_tokens);
    history.append(Message::system(system_prompt(true)));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = std::io::stdout();

    writeln!(stdout, "Salespilot CLI (type 'exit' to quit)")?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let line = line.trim();

        match line.to_lowercase().as_str() {
            "" => continue,
            "/clear" => {
                history.clear();
                history.append(Message::system(system_prompt(true)));
                writeln!(stdout, "История очищена.")?;
                continue;
            }
            "/history" => {
                print_history(&mut stdout, &history)?;
                continue;
            }
            "exit" | "quit" => return Ok(()),
            _ => {}
        }

        app.handle_query(&mut history, line, true).await?;
    }
}

fn print_history(out: &mut impl Write, history: &SessionHistory) -> std::io::Result<()> {
    let messages = history.snapshot();
    if messages.is_empty() {
        return writeln!(out, "История пуста.");
    }
    writeln!(
        out,
        "История ({} сообщений, ~{} токенов):",
        messages.len(),
        history.token_count()
    )?;
    for (i, msg) in messages.iter().enumerate() {
        let mut preview = preview(msg);
        if preview.is_empty() {
            preview = "(empty)".into();
        }
        writeln!(out, "{}) {}: {}", i + 1, msg.role, preview)?;
    }
    Ok(())
}

/// The first 120 characters of the message text.
fn preview(msg: &Message) -> String {
    let text = msg.text().trim();
    let mut out: String = text.chars().take(120).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}
