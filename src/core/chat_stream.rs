use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiError, ByteStream};
use crate::core::decoder::Utf8StreamDecoder;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Longest wait for the next chunk before the stream is abandoned.
    pub idle_timeout: Option<Duration>,
}

/// Why a reply stream stopped.
#[derive(Debug)]
pub enum StreamEnd {
    /// The server closed the body normally.
    Completed,
    ReadFailed(ApiError),
    TimedOut(Duration),
    Cancelled,
}

impl StreamEnd {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamEnd::Completed)
    }
}

enum Next {
    Chunk(Result<Vec<u8>, ApiError>),
    Closed,
    Idle(Duration),
    Cancelled,
}

async fn next_chunk(
    stream: &mut ByteStream,
    options: &StreamOptions,
    cancel: &CancellationToken,
) -> Next {
    let read = async {
        match options.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(item) => item.map_or(Next::Closed, Next::Chunk),
                Err(_) => Next::Idle(limit),
            },
            None => stream.next().await.map_or(Next::Closed, Next::Chunk),
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Next::Cancelled,
        next = read => next,
    }
}

/// Pulls chunks off `stream` in order, decodes them and hands each non-empty
/// piece of text to `on_text`.
///
/// On normal completion the decoder is flushed, so a truncated trailing
/// character still shows up as U+FFFD. When the stream stops early the
/// partial character is dropped instead.
pub async fn consume_stream<F>(
    mut stream: ByteStream,
    options: &StreamOptions,
    cancel: &CancellationToken,
    mut on_text: F,
) -> StreamEnd
where
    F: FnMut(&str),
{
    let mut decoder = Utf8StreamDecoder::new();
    let mut chunks = 0usize;

    let end = loop {
        match next_chunk(&mut stream, options, cancel).await {
            Next::Chunk(Ok(bytes)) => {
                chunks += 1;
                let text = decoder.decode(&bytes);
                if !text.is_empty() {
                    on_text(&text);
                }
            }
            Next::Chunk(Err(err)) => break StreamEnd::ReadFailed(err),
            Next::Closed => break StreamEnd::Completed,
            Next::Idle(limit) => break StreamEnd::TimedOut(limit),
            Next::Cancelled => break StreamEnd::Cancelled,
        }
    };

    if end.is_completed() {
        let tail = decoder.finish();
        if !tail.is_empty() {
            on_text(&tail);
        }
    } else {
        decoder.reset();
    }

    debug!(chunks, ?end, "reply stream ended");
    end
}
