//! Relay roles, frames and payload shapes.
//!
//! # Design Decisions
//! - Frames are opaque: controller frames leave exactly as they arrived
//! - Viewer frames are wrapped in a JSON envelope for controllers
//! - Routing follows the payload variant, not the sender at call time

use std::fmt;

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes};
use serde::{Deserialize, Serialize};

/// Connection role, fixed at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Controller,
    Viewer,
}

impl Role {
    /// Interpret the `type` query parameter. Anything but `viewer` is a controller.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("viewer") => Role::Viewer,
            _ => Role::Controller,
        }
    }

    /// The role that receives this role's messages.
    pub fn audience(self) -> Role {
        match self {
            Role::Controller => Role::Viewer,
            Role::Viewer => Role::Controller,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Controller => "controller",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A data frame as carried through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    Text(Utf8Bytes),
    Binary(Bytes),
}

impl RelayFrame {
    /// Data frames only; control frames are not relayed.
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(RelayFrame::Text(text)),
            Message::Binary(data) => Some(RelayFrame::Binary(data)),
            _ => None,
        }
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn to_text(&self) -> String {
        match self {
            RelayFrame::Text(text) => text.as_str().to_owned(),
            RelayFrame::Binary(data) => String::from_utf8_lossy(data).into_owned(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RelayFrame::Text(text) => text.as_str().len(),
            RelayFrame::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RelayFrame> for Message {
    fn from(frame: RelayFrame) -> Self {
        match frame {
            RelayFrame::Text(text) => Message::Text(text),
            RelayFrame::Binary(data) => Message::Binary(data),
        }
    }
}

/// Wrapper applied to viewer messages before they reach controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerEnvelope {
    pub from: Role,
    pub payload: String,
}

/// What one inbound frame becomes on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayPayload {
    /// Controller frame, forwarded verbatim to viewers.
    Raw(RelayFrame),
    /// Viewer frame, wrapped and forwarded to controllers.
    ViewerEnvelope(ViewerEnvelope),
}

impl RelayPayload {
    pub fn from_inbound(sender: Role, frame: RelayFrame) -> Self {
        match sender {
            Role::Controller => RelayPayload::Raw(frame),
            Role::Viewer => RelayPayload::ViewerEnvelope(ViewerEnvelope {
                from: Role::Viewer,
                payload: frame.to_text(),
            }),
        }
    }

    /// Role whose members receive this payload.
    pub fn audience(&self) -> Role {
        match self {
            RelayPayload::Raw(_) => Role::Controller.audience(),
            RelayPayload::ViewerEnvelope(envelope) => envelope.from.audience(),
        }
    }

    /// Serialize for the wire.
    pub fn into_frame(self) -> Result<RelayFrame, serde_json::Error> {
        match self {
            RelayPayload::Raw(frame) => Ok(frame),
            RelayPayload::ViewerEnvelope(envelope) => {
                Ok(RelayFrame::Text(serde_json::to_string(&envelope)?.into()))
            }
        }
    }
}
