//! JSON and CBOR encodings of the event envelope.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::ProtocolError,
    message::{ClientMessage, ServerMessage},
};

fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

fn to_json<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    ciborium::de::from_reader(bytes)
        .map_err(|e| ProtocolError::CborDecode { reason: e.to_string() })
}

fn to_cbor<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(message, &mut buf)
        .map_err(|e| ProtocolError::CborEncode { reason: e.to_string() })?;
    Ok(buf)
}

impl ClientMessage {
    /// Decode a text frame.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        from_json(text)
    }

    /// Decode a binary frame.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ProtocolError> {
        from_cbor(bytes)
    }

    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        to_json(self)
    }

    /// Encode as a binary frame.
    pub fn to_cbor(&self) -> Result<Vec<u8>, ProtocolError> {
        to_cbor(self)
    }
}

impl ServerMessage {
    /// Decode a text frame.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        from_json(text)
    }

    /// Decode a binary frame.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ProtocolError> {
        from_cbor(bytes)
    }

    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        to_json(self)
    }

    /// Encode as a binary frame.
    pub fn to_cbor(&self) -> Result<Vec<u8>, ProtocolError> {
        to_cbor(self)
    }
}
