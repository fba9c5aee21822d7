//! Wire messages and JSON codec for the room sync protocol.
//!
//! This crate owns the datagram representation used by both the client core
//! and the relay server. Every datagram carries exactly one JSON object whose
//! `action` field names the message shape.
//!
//! DESIGN
//! ======
//! Decoding is two-pass: the envelope is read first for its `action` only,
//! then the full payload is parsed against the shape that action names.
//! Unknown actions decode to `Ok(None)` so older peers tolerate newer ones.

use serde::{Deserialize, Serialize};

/// Largest datagram either side reads in one call.
pub const MAX_DATAGRAM_BYTES: usize = 1024;

// =============================================================================
// ACTIONS
// =============================================================================

pub const ACTION_CREATE_ROOM: &str = "create_room";
pub const ACTION_JOIN_ROOM: &str = "join_room";
pub const ACTION_ROOM_CREATED: &str = "room_created";
pub const ACTION_JOINED_ROOM: &str = "joined_room";
pub const ACTION_SEND_TRANSFORM: &str = "send_transform";
pub const ACTION_ERROR: &str = "error";

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The datagram is not valid UTF-8 text.
    #[error("datagram is not utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The text is not JSON, lacks a string `action`, or its payload does not
    /// match the shape the action names.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// VALUE TYPES
// =============================================================================

/// A 3D vector as it appears on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion as it appears on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    #[must_use]
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Full transform payload carried by `send_transform`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformUpdate {
    pub position: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
}

/// Every message shape the protocol knows about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Message {
    /// Client asks the relay to open a fresh room.
    CreateRoom,
    /// Client asks to join an existing room.
    JoinRoom { room_code: String },
    /// Relay confirms a room was created for the sender.
    RoomCreated { room_code: String },
    /// Relay confirms the sender joined a room.
    JoinedRoom { room_code: String },
    /// Transform broadcast from whichever peer currently holds control.
    #[serde(rename = "send_transform")]
    Transform(TransformUpdate),
    /// Relay-reported failure. Fatal to the client session.
    Error { message: String },
}

impl Message {
    /// The wire discriminator for this message.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::CreateRoom => ACTION_CREATE_ROOM,
            Self::JoinRoom { .. } => ACTION_JOIN_ROOM,
            Self::RoomCreated { .. } => ACTION_ROOM_CREATED,
            Self::JoinedRoom { .. } => ACTION_JOINED_ROOM,
            Self::Transform(_) => ACTION_SEND_TRANSFORM,
            Self::Error { .. } => ACTION_ERROR,
        }
    }
}

/// First-pass view of a datagram: the discriminator only.
#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(borrow)]
    action: std::borrow::Cow<'a, str>,
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a message as JSON text.
#[must_use]
pub fn encode(message: &Message) -> String {
    // Serializing these plain structs cannot fail; non-finite floats become `null`.
    serde_json::to_string(message).unwrap_or_default()
}

/// Encode a message straight into datagram bytes.
#[must_use]
pub fn encode_bytes(message: &Message) -> Vec<u8> {
    encode(message).into_bytes()
}

/// Decode JSON text into a message.
///
/// Returns `Ok(None)` when the `action` is not one this crate knows.
///
/// # Errors
///
/// Returns [`CodecError::Json`] when the text is not JSON, has no string
/// `action`, or the payload does not match the shape named by `action`.
pub fn decode(text: &str) -> Result<Option<Message>, CodecError> {
    let envelope: Envelope<'_> = serde_json::from_str(text)?;
    if !is_known_action(&envelope.action) {
        return Ok(None);
    }
    let message: Message = serde_json::from_str(text)?;
    Ok(Some(message))
}

/// Decode raw datagram bytes into a message.
///
/// # Errors
///
/// Returns [`CodecError::Utf8`] for non-text datagrams, otherwise as [`decode`].
pub fn decode_bytes(bytes: &[u8]) -> Result<Option<Message>, CodecError> {
    let text = std::str::from_utf8(bytes)?;
    decode(text)
}

fn is_known_action(action: &str) -> bool {
    matches!(
        action,
        ACTION_CREATE_ROOM
            | ACTION_JOIN_ROOM
            | ACTION_ROOM_CREATED
            | ACTION_JOINED_ROOM
            | ACTION_SEND_TRANSFORM
            | ACTION_ERROR
    )
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
