//! Deferred fetch operations
//!
//! A [`FetchOperation`] is a queued GET waiting for the scheduler. Running it
//! performs the transport call with the chosen identity attached, measures
//! duration, and resolves the submitting caller's one-shot broker exactly
//! once with either the body or the captured transport error.

use std::time::Instant;

use bytes::Bytes;
use reqwest::StatusCode;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::error::PacerError;

/// How the response body is delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchMode {
    /// Decode the body as text
    Text,
    /// Hand back the body bytes untouched
    Raw,
}

/// Response body in the shape the caller asked for
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Text(String),
    Bytes(Bytes),
}

impl Payload {
    pub(crate) fn into_text(self) -> String {
        match self {
            Payload::Text(text) => text,
            Payload::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub(crate) fn into_bytes(self) -> Bytes {
        match self {
            Payload::Text(text) => Bytes::from(text),
            Payload::Bytes(bytes) => bytes,
        }
    }
}

/// Outcome delivered through the caller's broker
pub(crate) type FetchResult = Result<Payload, PacerError>;

/// A unit of pending work: one GET plus the broker that reports its outcome
///
/// Created at submission time, consumed exactly once by the scheduler.
pub(crate) struct FetchOperation {
    url: String,
    user_agent: &'static str,
    mode: FetchMode,
    client: reqwest::Client,
    reply: oneshot::Sender<FetchResult>,
}

impl FetchOperation {
    pub(crate) fn new(
        url: impl Into<String>,
        user_agent: &'static str,
        mode: FetchMode,
        client: reqwest::Client,
        reply: oneshot::Sender<FetchResult>,
    ) -> Self {
        Self {
            url: url.into(),
            user_agent,
            mode,
            client,
            reply,
        }
    }

    /// Target URL of this operation
    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// Execute the GET and resolve the broker
    ///
    /// A transport failure lands in this operation's broker only; sibling
    /// operations in the same batch are untouched.
    pub(crate) async fn run(self) {
        let start = Instant::now();
        let outcome = Self::fetch(&self.client, &self.url, self.user_agent, self.mode).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok((status, payload)) => {
                info!(
                    url = %self.url,
                    status = status.as_u16(),
                    duration_ms,
                    agent = self.user_agent,
                    "GET request completed"
                );
                Ok(payload)
            }
            Err(err) => {
                error!(
                    url = %self.url,
                    error = %err,
                    duration_ms,
                    agent = self.user_agent,
                    "GET request failed"
                );
                Err(PacerError::from(err))
            }
        };

        if self.reply.send(result).is_err() {
            debug!(url = %self.url, "caller went away before the result arrived");
        }
    }

    async fn fetch(
        client: &reqwest::Client,
        url: &str,
        user_agent: &str,
        mode: FetchMode,
    ) -> Result<(StatusCode, Payload), reqwest::Error> {
        let response = client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await?;

        let status = response.status();
        // Non-2xx statuses are not failures; the body is returned as-is
        let payload = match mode {
            FetchMode::Text => Payload::Text(response.text().await?),
            FetchMode::Raw => Payload::Bytes(response.bytes().await?),
        };

        Ok((status, payload))
    }
}
