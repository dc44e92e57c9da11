//! REST payloads: messages, drafts, credentials, profile updates.

use serde::{Deserialize, Serialize};

use crate::{ChatError, MessageId, UserId};

/// A chat message, immutable once received.
///
/// Ordering within a conversation is arrival order, never `created_at`
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned message id.
    pub id: MessageId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Addressee of the message.
    pub recipient_id: UserId,
    /// Text body, if any.
    #[serde(default)]
    pub text: Option<String>,
    /// Image reference, if any.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Server timestamp (unix seconds). Informational only.
    pub created_at: u64,
}

impl Message {
    /// Validate a message decoded at the transport boundary.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.id.is_empty() || self.sender_id.is_empty() || self.recipient_id.is_empty() {
            return Err(ChatError::Validation("message has an empty id field".into()));
        }
        if self.text.is_none() && self.image_url.is_none() {
            return Err(ChatError::Validation(
                "message carries neither text nor image".into(),
            ));
        }
        Ok(())
    }
}

/// An outgoing message payload, before the server has assigned an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Text body, if any.
    #[serde(default)]
    pub text: Option<String>,
    /// Image reference, if any.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Draft {
    /// Create a text-only draft.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            text: Some(body.into()),
            image_url: None,
        }
    }

    /// Validate a draft before it leaves the client.
    ///
    /// Caught locally so an empty send never reaches the network.
    pub fn validate(&self) -> Result<(), ChatError> {
        let text_empty = self.text.as_deref().map_or(true, str::is_empty);
        let image_empty = self.image_url.as_deref().map_or(true, str::is_empty);
        if text_empty && image_empty {
            return Err(ChatError::Validation("message is empty".into()));
        }
        Ok(())
    }
}

/// Credentials for sign-up and sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Display name; required by sign-up, ignored by sign-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Credentials {
    /// Validate credentials before posting them.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(ChatError::Validation("email and password are required".into()));
        }
        Ok(())
    }
}

/// A partial profile mutation. Unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New avatar reference, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
