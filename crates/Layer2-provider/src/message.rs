//! Message types for model communication

use counsel_foundation::{BinaryPayload, ConversationTurn, Speaker};
use serde::{Deserialize, Serialize};

/// Author of a content block as the backend sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// One piece of a content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Text(String),

    /// Base64 encoded binary data sent natively (PDFs, images)
    InlineData { mime_type: String, data: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::InlineData { .. } => None,
        }
    }
}

impl From<&BinaryPayload> for Part {
    fn from(payload: &BinaryPayload) -> Self {
        Part::InlineData {
            mime_type: payload.mime_type.clone(),
            data: payload.base64_data.clone(),
        }
    }
}

/// A turn of model input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user content block from parts
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: ContentRole::User,
            parts,
        }
    }

    /// Create a user content block holding only text
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::text(text)])
    }

    /// Create a model content block holding only text
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text of every text part
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }
}

/// History turns replay as plain text
impl From<&ConversationTurn> for Content {
    fn from(turn: &ConversationTurn) -> Self {
        match turn.speaker {
            Speaker::User => Content::user_text(turn.text.clone()),
            Speaker::Assistant => Content::model_text(turn.text.clone()),
        }
    }
}
