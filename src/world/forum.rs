//! Message log scoped to a container vessel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{ParadoxError, Result};
use crate::store::{MessageId, Store};
use crate::world::names::QUESTION_WORDS;
use crate::world::VesselId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub(crate) id: MessageId,
    pub(crate) host_id: VesselId,
    pub(crate) from_id: VesselId,
    pub(crate) message: String,
    pub(crate) timestamp: DateTime<Utc>,
}

/// How a message reads when narrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Emote(String),
    Question(String),
    Exclamation(String),
    Pointer(VesselId),
    Statement(String),
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn host_id(&self) -> VesselId {
        self.host_id
    }

    pub fn from_id(&self) -> VesselId {
        self.from_id
    }

    pub fn text(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn kind(&self) -> MessageKind {
        classify(&self.message)
    }

    /// Narrate the message as `[T] The <author> ...`.
    pub fn render(&self, store: &dyn Store, clock: &Clock) -> String {
        let author = store
            .get(self.from_id)
            .map(|v| v.full_name_with_id())
            .unwrap_or_else(|| format!("ghost (ID: {})", self.from_id));
        let body = match self.kind() {
            MessageKind::Emote(rest) => rest,
            MessageKind::Question(m) => format!("asked '{}?'", m),
            MessageKind::Exclamation(m) => format!("shouted '{}'", m),
            MessageKind::Pointer(id) => match store.get(id) {
                Some(v) => format!("indicated the {}", v.full_name_with_id()),
                None => format!("said '{}.'", id),
            },
            MessageKind::Statement(m) => format!("said '{}.'", m),
        };
        format!("[{}] The {} {}", clock.to_str(self.timestamp), author, body)
    }
}

/// Classify message text. Pointers are only recognised syntactically here;
/// rendering falls back to a statement when the id does not resolve.
pub fn classify(text: &str) -> MessageKind {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("me ") {
        return MessageKind::Emote(rest.trim().to_string());
    }
    let first = text.split_whitespace().next().unwrap_or_default();
    if text.ends_with('?') || QUESTION_WORDS.iter().any(|w| w.eq_ignore_ascii_case(first)) {
        return MessageKind::Question(text.trim_end_matches('?').to_string());
    }
    if text.ends_with('!') {
        return MessageKind::Exclamation(text.to_string());
    }
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(id) = text.parse::<VesselId>() {
            return MessageKind::Pointer(id);
        }
    }
    MessageKind::Statement(text.trim_end_matches('.').to_string())
}

/// Append a message to `host_id`'s log, validating both ends first.
pub fn post(store: &mut dyn Store, host_id: VesselId, from_id: VesselId, text: &str) -> Result<Message> {
    if store.get(host_id).is_none() {
        return Err(ParadoxError::Validation(format!(
            "message host {} does not exist",
            host_id
        )));
    }
    if store.get(from_id).is_none() {
        return Err(ParadoxError::Validation(format!(
            "message author {} does not exist",
            from_id
        )));
    }
    let message = Message {
        id: store.next_message_id(),
        host_id,
        from_id,
        message: text.trim().to_string(),
        timestamp: Utc::now(),
    };
    store.append(message.clone());
    Ok(message)
}

/// The log of `host_id`, oldest first. Silent containers show nothing.
pub fn forum(store: &dyn Store, host_id: VesselId) -> Vec<Message> {
    match store.get(host_id) {
        Some(host) if !host.is_silent() => store.messages(host_id),
        _ => Vec::new(),
    }
}

/// The newest `limit` entries of the log, oldest first.
pub fn recent(store: &dyn Store, host_id: VesselId, limit: usize) -> Vec<Message> {
    let all = forum(store, host_id);
    let skip = all.len().saturating_sub(limit);
    all.into_iter().skip(skip).collect()
}
