//! Classification of heterogeneous JSON records.
//!
//! Each assistant writes its own record shape. They are mapped onto a small
//! tagged union with best-effort extraction; anything unrecognized is kept
//! as [`RawRecord::Opaque`] rather than rejected.

use serde_json::{Map, Value};

use crate::normalizer::normalize_json_timestamp;

/// Keys probed, in order, for a record's timestamp.
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "ts", "created_at", "createdAt", "create_time", "time"];

/// Keys probed for a conversation or session id.
const CONVERSATION_KEYS: &[&str] = &["sessionId", "session_id", "conversation_id", "conversationId", "uuid", "id"];

/// Keys holding a list of messages.
const MESSAGE_LIST_KEYS: &[&str] = &["messages", "chat_messages", "conversation"];

/// Nesting bound for content extraction.
const MAX_CONTENT_DEPTH: usize = 4;

/// One chat message, whatever file it came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatMessage {
    pub role: Option<String>,
    pub text: String,
    pub timestamp: Option<String>,
    pub model: Option<String>,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Message(ChatMessage),
    Conversation {
        id: Option<String>,
        title: Option<String>,
        timestamp: Option<String>,
        messages: Vec<ChatMessage>,
    },
    Text(String),
    Opaque(Value),
}

impl RawRecord {
    pub fn classify(value: &Value) -> RawRecord {
        match value {
            Value::String(text) => RawRecord::Text(text.clone()),
            Value::Object(obj) => {
                if let Some(list) = message_list(obj) {
                    let id = first_string(obj, CONVERSATION_KEYS);
                    let messages = list
                        .iter()
                        .filter_map(Value::as_object)
                        .filter_map(|m| message_from_object(m, 0).or_else(|| bare_message(m)))
                        .map(|mut m| {
                            if m.conversation_id.is_none() {
                                m.conversation_id = id.clone();
                            }
                            m
                        })
                        .collect();
                    RawRecord::Conversation {
                        id,
                        title: first_string(obj, &["name", "title"]),
                        timestamp: first_timestamp(obj),
                        messages,
                    }
                } else if let Some(message) = message_from_object(obj, 0) {
                    RawRecord::Message(message)
                } else {
                    RawRecord::Opaque(value.clone())
                }
            }
            Value::Array(items) => {
                let messages: Vec<ChatMessage> = items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|m| message_from_object(m, 0))
                    .collect();
                if messages.is_empty() {
                    RawRecord::Opaque(value.clone())
                } else {
                    RawRecord::Conversation { id: None, title: None, timestamp: None, messages }
                }
            }
            other => RawRecord::Opaque(other.clone()),
        }
    }

    /// Messages carried by the record, in file order.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            RawRecord::Message(message) => vec![message],
            RawRecord::Conversation { messages, .. } => messages,
            RawRecord::Text(_) | RawRecord::Opaque(_) => Vec::new(),
        }
    }
}

fn message_list(obj: &Map<String, Value>) -> Option<&Vec<Value>> {
    MESSAGE_LIST_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_array))
}

fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn first_timestamp(obj: &Map<String, Value>) -> Option<String> {
    TIMESTAMP_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(normalize_json_timestamp)
}

/// Flatten message content: a string, a list of blocks, or nested objects.
pub fn content_text(value: &Value) -> String {
    content_text_at(value, 0)
}

fn content_text_at(value: &Value, depth: usize) -> String {
    if depth > MAX_CONTENT_DEPTH {
        return String::new();
    }
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| content_text_at(item, depth + 1))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(obj) => {
            if let Some(Value::String(text)) = obj.get("text") {
                text.clone()
            } else if let Some(inner) = obj.get("content") {
                content_text_at(inner, depth + 1)
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

/// A list entry that only carries text, as inside a conversation document.
fn bare_message(obj: &Map<String, Value>) -> Option<ChatMessage> {
    let body = obj.get("text").or_else(|| obj.get("content"))?;
    Some(ChatMessage {
        role: first_string(obj, &["role", "type"]),
        text: content_text(body),
        timestamp: first_timestamp(obj),
        model: first_string(obj, &["model", "modelId"]),
        conversation_id: None,
    })
}

fn message_from_object(obj: &Map<String, Value>, depth: usize) -> Option<ChatMessage> {
    if depth > MAX_CONTENT_DEPTH {
        return None;
    }
    let timestamp = first_timestamp(obj);
    let conversation_id = first_string(obj, &["sessionId", "session_id", "conversation_id", "conversationId", "composerId"]);
    let model = first_string(obj, &["model", "modelId", "model_slug"]);

    // {"type": "user", "message": {"role": ..., "content": ...}}
    let kind = obj.get("type").and_then(Value::as_str);
    if let (Some(kind @ ("user" | "assistant" | "system")), Some(Value::Object(inner))) = (kind, obj.get("message")) {
        let text = inner.get("content").map(content_text).unwrap_or_default();
        return Some(ChatMessage {
            role: first_string(inner, &["role"]).or_else(|| Some(kind.to_string())),
            text,
            timestamp,
            model: first_string(inner, &["model"]).or(model),
            conversation_id,
        });
    }

    // {"timestamp": ..., "payload": {"type": "message", ...}}
    if let Some(Value::Object(payload)) = obj.get("payload") {
        if let Some(mut message) = message_from_object(payload, depth + 1) {
            message.timestamp = message.timestamp.or(timestamp);
            message.conversation_id = message.conversation_id.or(conversation_id);
            message.model = message.model.or(model);
            return Some(message);
        }
    }

    // {"role" | "sender": ..., "content" | "text": ...}
    if let Some(role) = first_string(obj, &["role", "sender"]) {
        if let Some(body) = obj.get("content").or_else(|| obj.get("text")) {
            return Some(ChatMessage {
                role: Some(role),
                text: content_text(body),
                timestamp,
                model,
                conversation_id,
            });
        }
    }

    // Prompt history: {"display": ..., "sessionId": ...} or {"text": ..., "ts": ...}
    let prompt = obj
        .get("display")
        .and_then(Value::as_str)
        .or_else(|| {
            if obj.contains_key("ts") || obj.contains_key("session_id") {
                obj.get("text").and_then(Value::as_str)
            } else {
                None
            }
        });
    if let Some(prompt) = prompt {
        return Some(ChatMessage {
            role: Some("user".to_string()),
            text: prompt.to_string(),
            timestamp,
            model,
            conversation_id,
        });
    }

    None
}
