// SPDX-License-Identifier: Apache-2.0
//! Pluggable frame encode/decode. The default is JSON; binary codecs are a
//! matter of implementing [`Codec`] — the codec must be symmetric across
//! both endpoints of one [`crate::channel::PeerChannel`].

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Encoding the outbound message failed.
    #[error("encode failed: {0}")]
    Encode(String),
    /// Decoding an inbound byte frame failed.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Symmetric encode/decode for messages of type `M` over a byte transport.
pub trait Codec<M>: Send + Sync {
    /// Encodes one message into its wire representation.
    fn encode(&self, message: &M) -> Result<Vec<u8>, CodecError>;
    /// Decodes one message from its wire representation.
    fn decode(&self, bytes: &[u8]) -> Result<M, CodecError>;
}

/// The default codec: each message is one JSON document, newline-delimited
/// by the transport (transports are free to frame differently; this codec
/// only (de)serializes the payload itself).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<M> Codec<M> for JsonCodec
where
    M: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, message: &M) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(message).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<M, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        seq: u64,
    }

    #[test]
    fn json_codec_round_trips() {
        let codec = JsonCodec;
        let msg = Ping { seq: 7 };
        let bytes = codec.encode(&msg).unwrap();
        let decoded: Ping = codec.decode(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn json_codec_reports_decode_errors() {
        let codec = JsonCodec;
        let err: Result<Ping, _> = codec.decode(b"not json");
        assert!(err.is_err());
    }
}
