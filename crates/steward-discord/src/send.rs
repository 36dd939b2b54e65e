//! Outbound sends with explicit outcomes.
//!
//! Every reply goes through [`send_reply`], which bounds the call with a
//! timeout and folds the transport result into a [`SendOutcome`] so the
//! dispatcher can match on outcome kind instead of unwinding: permission
//! denial is contained per-channel, everything else per-event.

use std::time::Duration;

use serenity::http::{Http, HttpError};
use serenity::model::id::ChannelId;

/// Maximum characters per Discord message (2000 is the limit; we use 1950
/// for safety).
const CHUNK_MAX: usize = 1950;

/// Upper bound for one outbound call, so a stalled send never blocks
/// independent events indefinitely.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord JSON error code for "Missing Permissions".
const MISSING_PERMISSIONS: isize = 50013;

#[derive(Debug)]
pub enum SendOutcome {
    Sent,
    /// The bot can read but not post in this channel.
    NoPermission,
    TimedOut,
    Failed(serenity::Error),
}

pub async fn send_reply(http: &Http, channel_id: ChannelId, text: &str) -> SendOutcome {
    match tokio::time::timeout(SEND_TIMEOUT, send_chunked(http, channel_id, text)).await {
        Ok(Ok(())) => SendOutcome::Sent,
        Ok(Err(e)) if is_missing_permission(&e) => SendOutcome::NoPermission,
        Ok(Err(e)) => SendOutcome::Failed(e),
        Err(_) => SendOutcome::TimedOut,
    }
}

/// Send `text` to `channel_id` in ≤1950-char chunks.
async fn send_chunked(
    http: &Http,
    channel_id: ChannelId,
    text: &str,
) -> Result<(), serenity::Error> {
    for chunk in split_chunks(text) {
        channel_id.say(http, &chunk).await?;
    }
    Ok(())
}

fn is_missing_permission(e: &serenity::Error) -> bool {
    matches!(
        e,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp))
            if resp.error.code == MISSING_PERMISSIONS
    )
}

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, preferring
/// splits on whitespace/newline boundaries to avoid cutting words mid-way.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > CHUNK_MAX {
        let window = &remaining[..CHUNK_MAX];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .unwrap_or(CHUNK_MAX);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks("Congrats <@1>, you've reached level 2!");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_text_splits_on_newline() {
        let line = "a".repeat(1000);
        let text = format!("{line}\n{line}");
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX, "chunk too large: {}", c.len());
        }
    }

    #[test]
    fn very_long_word_still_splits() {
        let text = "x".repeat(4000);
        let chunks = split_chunks(&text);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX);
        }
    }
}
