//! Payload decoding

use std::error::Error as StdError;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Payload could not be turned into the requested type.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct DecodeError {
    source: Box<dyn StdError + Send + Sync>,
}

impl DecodeError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync> {
        self.source
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err)
    }
}

/// Turns raw payload bytes into a typed value.
pub trait Decoder: Send + Sync {
    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, DecodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(payload)?)
    }
}
