//! Transcript rendering model
//!
//! What a message *is* (the immutable record) and what it *renders as*
//! are different things: AI-sentinel payloads are parsed into the reply
//! variant, and payloads that fail to parse render as a visible
//! parse-error entry carrying the raw payload for debugging — never as a
//! hard failure.

use crate::types::{MessageRecord, Sender};
use chrono::{DateTime, Utc};
use devroom_protocol::{AiResponse, ProjectBundle};

/// Rendered form of one message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Human chat text
    Plain(String),
    /// Parsed assistant reply
    Ai(AiResponse),
    /// Assistant payload that failed to parse; raw text kept for display
    Malformed {
        /// The unparsable payload
        raw: String,
    },
}

impl MessageBody {
    /// Classify a payload by its sender
    #[must_use]
    pub fn classify(sender: &Sender, message: &str) -> Self {
        if !sender.is_ai() {
            return Self::Plain(message.to_owned());
        }
        match AiResponse::parse(message) {
            Ok(reply) => Self::Ai(reply),
            Err(err) => {
                tracing::warn!(%err, "AI payload failed to parse; rendering raw");
                Self::Malformed {
                    raw: message.to_owned(),
                }
            }
        }
    }

    /// Text shown in the chat column
    #[must_use]
    pub fn display_text(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Ai(reply) => reply.text(),
            Self::Malformed { raw } => raw,
        }
    }

    /// Whether this entry renders as a parse error
    #[inline]
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// The bundle, when this entry carries one
    #[must_use]
    pub fn bundle(&self) -> Option<&ProjectBundle> {
        match self {
            Self::Ai(reply) => reply.bundle(),
            Self::Plain(_) | Self::Malformed { .. } => None,
        }
    }
}

/// One rendered transcript entry
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    /// Who sent it
    pub sender: Sender,
    /// Rendered body
    pub body: MessageBody,
    /// Arrival timestamp
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Render a persisted or locally created record
    #[must_use]
    pub fn from_record(record: &MessageRecord) -> Self {
        Self {
            sender: record.sender.clone(),
            body: MessageBody::classify(&record.sender, &record.message),
            timestamp: record.timestamp,
        }
    }

    /// Render an incoming broadcast, stamped at arrival
    #[must_use]
    pub fn incoming(sender: Sender, message: &str) -> Self {
        Self {
            body: MessageBody::classify(&sender, message),
            sender,
            timestamp: Utc::now(),
        }
    }
}
