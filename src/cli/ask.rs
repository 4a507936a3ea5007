//! One-shot "ask" command

use std::error::Error;
use std::io::{self, Write};

use tokio::sync::mpsc;
use tracing::warn;

use crate::api::ChatRequest;
use crate::cli::Session;
use crate::core::chat::{ChatEvent, ChatStore, Rejection, SubmitOutcome};
use crate::core::message::{History, Message, Role};
use crate::utils::logging::TranscriptLog;

pub async fn run_ask(
    session: Session,
    question: &str,
    blocking: bool,
    transcript: Option<TranscriptLog>,
) -> Result<(), Box<dyn Error>> {
    if question.trim().is_empty() {
        eprintln!("Usage: policychat ask <question>");
        std::process::exit(1);
    }

    if blocking {
        let request = ChatRequest {
            question: question.to_string(),
            history: Vec::new(),
        };
        match session
            .api
            .chat_blocking(&session.resolved.context, &request)
            .await
        {
            Ok(answer) => {
                println!("{answer}");
                log_exchange(
                    transcript.as_ref(),
                    &[Message::user(question), Message::assistant(answer)],
                );
                Ok(())
            }
            Err(err) => {
                eprintln!("❌ Error: {err}");
                std::process::exit(1);
            }
        }
    } else {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let store = ChatStore::new(session.api, session.resolved.context)
            .with_stream_options(session.resolved.stream)
            .with_events(tx);

        let outcome = stream_reply(&store, &mut rx, question, &mut io::stdout()).await?;
        println!();
        log_exchange(transcript.as_ref(), store.history().messages());

        if !matches!(outcome, SubmitOutcome::Completed) {
            std::process::exit(1);
        }
        Ok(())
    }
}

/// Appends `messages` to the transcript, if one is open. Write failures are
/// logged and otherwise ignored.
pub(crate) fn log_exchange(transcript: Option<&TranscriptLog>, messages: &[Message]) {
    let Some(log) = transcript else {
        return;
    };
    if let Err(err) = log.log_exchange(messages) {
        warn!(error = %err, path = %log.path().display(), "failed to write transcript");
    }
}

/// Submits `question` and echoes the reply to `out` as it streams. Ctrl-C
/// stops the reply but keeps what already arrived.
///
/// Returns once this submission finishes, whatever other callers of the same
/// store are doing.
pub(crate) async fn stream_reply<W: Write>(
    store: &ChatStore,
    events: &mut mpsc::UnboundedReceiver<ChatEvent>,
    question: &str,
    out: &mut W,
) -> Result<SubmitOutcome, Box<dyn Error>> {
    let mut submission = tokio::spawn({
        let store = store.clone();
        let question = question.to_string();
        async move { store.send_message(&question).await }
    });
    let interrupt = tokio::spawn({
        let store = store.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                store.cancel_current();
            }
        }
    });

    let mut streamed = String::new();
    let joined = loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => echo_chunk(event, out, &mut streamed)?,
            joined = &mut submission => break joined,
        }
    };
    interrupt.abort();
    let outcome = joined?;

    // Chunks sent just before the submission finished.
    while let Ok(event) = events.try_recv() {
        echo_chunk(event, out, &mut streamed)?;
    }

    match outcome {
        SubmitOutcome::Rejected(Rejection::Busy) => {
            eprintln!("⚠️  Still waiting on the previous answer.");
        }
        SubmitOutcome::Rejected(Rejection::EmptyInput) => {}
        _ => write!(out, "{}", unshown_tail(&store.history(), &streamed))?,
    }
    out.flush()?;
    Ok(outcome)
}

fn echo_chunk<W: Write>(
    event: ChatEvent,
    out: &mut W,
    streamed: &mut String,
) -> Result<(), Box<dyn Error>> {
    if let ChatEvent::ReplyChunk { text, .. } = event {
        write!(out, "{text}")?;
        out.flush()?;
        streamed.push_str(&text);
    }
    Ok(())
}

/// Text the store added to the reply after the last streamed chunk, such as
/// the apology for a failed request or the interruption marker.
pub(crate) fn unshown_tail(history: &History, streamed: &str) -> String {
    match history.last() {
        Some(last) if last.role == Role::Assistant => last
            .content
            .strip_prefix(streamed)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
