//! Interactive line-based chat session

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::ask::{log_exchange, stream_reply};
use crate::cli::Session;
use crate::core::chat::ChatStore;
use crate::core::message::Message;
use crate::utils::logging::TranscriptLog;

const PROMPT: &str = "> ";

pub async fn run_chat(
    session: Session,
    transcript: Option<TranscriptLog>,
) -> Result<(), Box<dyn Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut store = ChatStore::new(session.api, session.resolved.context)
        .with_stream_options(session.resolved.stream)
        .with_events(tx);

    if let Some(greeting) = session.resolved.greeting {
        println!("{greeting}\n");
        store = store.with_greeting(greeting);
    }

    let mut logged = 0;
    log_new_messages(transcript.as_ref(), &store, &mut logged);

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "/quit" | "/exit") {
            break;
        }

        stream_reply(&store, &mut rx, question, &mut stdout).await?;
        println!("\n");
        log_new_messages(transcript.as_ref(), &store, &mut logged);
    }

    Ok(())
}

/// Appends settled messages past `logged` to the transcript, if one is open.
fn log_new_messages(transcript: Option<&TranscriptLog>, store: &ChatStore, logged: &mut usize) {
    if transcript.is_none() {
        return;
    }

    let history = store.history();
    let fresh: Vec<Message> = history
        .messages()
        .iter()
        .skip(*logged)
        .take_while(|message| !message.state.is_in_progress())
        .cloned()
        .collect();
    log_exchange(transcript, &fresh);
    *logged += fresh.len();
}
