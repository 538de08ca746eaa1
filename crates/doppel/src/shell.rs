// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `doppel shell` command implementation.
//!
//! Interactive REPL wired to the full pipeline: every line goes through
//! the same dispatcher the platform client would use, with replies
//! printed by the console gateway. Slash commands cover the runtime
//! state controls.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use doppel_config::DoppelConfig;
use doppel_core::{Attachment, DoppelError, InboundMessage};
use doppel_dispatch::{DispatchOutcome, Dispatcher, DispatcherParts};
use doppel_ollama::OllamaClient;
use doppel_state::StateStore;
use doppel_storage::{AuditLog, ConversationLog, EventBuffer};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Author id used for shell input; distinct from the agent's own id.
const LOCAL_USER: u64 = 1;
const SHELL_CHANNEL: u64 = 1;
const SELF_ID: u64 = 0;

/// Runs the interactive REPL.
pub async fn run_shell(config: DoppelConfig) -> Result<(), DoppelError> {
    let data_dir = Path::new(&config.app.data_dir);
    std::fs::create_dir_all(data_dir)?;

    let state = Arc::new(StateStore::new(data_dir.join("runtime_state.json"))?);
    if !state.persisted() {
        // First run: seed the switch from config.
        state.set_enabled(config.behavior.enabled_by_default).await?;
    }

    let conversation_log = Arc::new(ConversationLog::open(
        data_dir.join("conversations.jsonl"),
        data_dir.join("exports"),
    )?);
    let parts = DispatcherParts {
        channel: Arc::new(crate::console::ConsoleGateway),
        backend: Arc::new(OllamaClient::new(&config.ollama)?),
        transcriber: Arc::from(doppel_asr::build_transcriber(&config.asr)?),
        state: state.clone(),
        audit: Arc::new(AuditLog::open(data_dir.join("audit.json"))?),
        events: Arc::new(EventBuffer::new()),
        conversation_log: conversation_log.clone(),
    };
    let dispatcher = Dispatcher::new(config, Some(SELF_ID), parts);

    let shutdown = install_signal_handler();

    let mut rl = DefaultEditor::new()
        .map_err(|e| DoppelError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "doppel shell".bold().green());
    println!(
        "Type {} to exit, {} for commands.\n",
        "/quit".yellow(),
        "/help".yellow()
    );

    let prompt = format!("{}> ", "doppel".green());
    let mut next_id: u64 = 1;

    while !shutdown.is_cancelled() {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if let Some(handled) = handle_command(&state, &conversation_log, trimmed).await {
                    if let Err(e) = handled {
                        eprintln!("{}: {e}", "error".red());
                    }
                    continue;
                }

                let message = build_message(next_id, trimmed);
                next_id += 1;

                let outcome = dispatcher.dispatch(&message).await;
                report_outcome(&outcome);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    info!("shell session closed");
    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Slash commands against the runtime state. Returns `None` when the
/// input is a plain message for the pipeline.
async fn handle_command(
    state: &StateStore,
    conversation_log: &ConversationLog,
    input: &str,
) -> Option<Result<(), DoppelError>> {
    let scope_key = format!("channel:{SHELL_CHANNEL}");
    match input {
        "/help" => {
            println!("/on /off          enable or disable replies");
            println!("/style <id>       pin a reply style for this shell");
            println!("/style clear      remove the pin");
            println!("/state            show the runtime state");
            println!("/export           export recent conversation records");
            println!("/voice <path>     send a local audio file");
            println!("/quit             exit");
            Some(Ok(()))
        }
        "/on" => Some(state.set_enabled(true).await.map(|_| println!("enabled"))),
        "/off" => Some(state.set_enabled(false).await.map(|_| println!("disabled"))),
        "/export" => Some(match conversation_log.export().await {
            Ok(path) => {
                println!("exported to {}", path.display());
                Ok(())
            }
            Err(e) => Err(e),
        }),
        "/state" => Some(match state.load().await {
            Ok(s) => {
                println!("enabled={} manual_styles={:?}", s.enabled, s.manual_styles);
                Ok(())
            }
            Err(e) => Err(e),
        }),
        _ => {
            if let Some(style) = input.strip_prefix("/style ") {
                let style = style.trim();
                let result = if style == "clear" {
                    state.set_manual_style(&scope_key, None).await
                } else {
                    state.set_manual_style(&scope_key, Some(style)).await
                };
                return Some(result.map(|()| println!("style updated")));
            }
            None
        }
    }
}

fn build_message(id: u64, input: &str) -> InboundMessage {
    let (content, attachments) = match input.strip_prefix("/voice ") {
        Some(path) => {
            let path = path.trim();
            let filename = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string());
            (
                String::new(),
                vec![Attachment {
                    filename,
                    content_type: None,
                    url: path.to_string(),
                }],
            )
        }
        None => (input.to_string(), Vec::new()),
    };

    InboundMessage {
        id,
        author_id: LOCAL_USER,
        channel_id: SHELL_CHANNEL,
        guild_id: None,
        thread_id: None,
        content,
        attachments,
        author_is_bot: false,
        mentions: Vec::new(),
    }
}

fn report_outcome(outcome: &DispatchOutcome) {
    let note = match outcome {
        DispatchOutcome::Replied => return,
        DispatchOutcome::SelfMessage => "ignored: self message",
        DispatchOutcome::Blocked(_) => "ignored: blocked by access policy",
        DispatchOutcome::Disabled => "ignored: replies are disabled (/on to enable)",
        DispatchOutcome::EmptyContent => "ignored: nothing to respond to",
        DispatchOutcome::Duplicate => "ignored: near-duplicate of a recent message",
        DispatchOutcome::RateLimited => "ignored: rate limited",
        DispatchOutcome::TranscriptionFailed => "voice message could not be transcribed",
        DispatchOutcome::ImageOnly => "image-only message",
        DispatchOutcome::BackendFailed => "reply generation failed",
        DispatchOutcome::SendFailed => "reply could not be delivered",
    };
    println!("{}", note.dimmed());
}

/// SIGINT and SIGTERM both cancel the returned token.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, shutting down");
        }

        token_clone.cancel();
    });

    token
}
