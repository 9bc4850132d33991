//! The `[sender_id][empty][json_body]` envelope (spec.md §6).

use crate::defaults::{CLIENT_IDENTITY_PREFIX, WORKER_IDENTITY_PREFIX};
use crate::error::{ProtocolError, Result};

/// Who sent an envelope, derived from the identity frame's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    Client,
    Worker,
}

/// A decoded `[sender_id][empty][json_body]` message.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub sender_id: String,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn new(sender_id: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            sender_id: sender_id.into(),
            body,
        }
    }

    /// Classify the sender by its identity prefix.
    pub fn sender_kind(&self) -> Result<SenderKind> {
        if self.sender_id.starts_with(WORKER_IDENTITY_PREFIX) {
            Ok(SenderKind::Worker)
        } else if self.sender_id.starts_with(CLIENT_IDENTITY_PREFIX) {
            Ok(SenderKind::Client)
        } else {
            Err(ProtocolError::UnknownSenderKind(self.sender_id.clone()))
        }
    }

    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Build the raw 3 ROUTER-side frames: `[identity][empty][json]`.
    pub fn pack(&self) -> Vec<Vec<u8>> {
        vec![
            self.sender_id.clone().into_bytes(),
            Vec::new(),
            self.body.clone(),
        ]
    }

    /// Parse the raw ROUTER-side frames received off the socket.
    pub fn unpack(frames: &[Vec<u8>]) -> Result<Self> {
        if frames.len() < 3 {
            return Err(ProtocolError::InvalidFrameCount {
                expected: 3,
                got: frames.len(),
            });
        }
        let sender_id = String::from_utf8(frames[0].clone())
            .map_err(|_| ProtocolError::InvalidSenderIdentity)?;
        Ok(Self {
            sender_id,
            body: frames[2].clone(),
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_worker_and_client_senders() {
        let worker = Envelope::new("worker-abc", b"{}".to_vec());
        assert_eq!(worker.sender_kind().unwrap(), SenderKind::Worker);

        let client = Envelope::new("client-abc", b"{}".to_vec());
        assert_eq!(client.sender_kind().unwrap(), SenderKind::Client);
    }

    #[test]
    fn rejects_unknown_sender_prefix() {
        let stray = Envelope::new("mystery-abc", b"{}".to_vec());
        assert!(matches!(
            stray.sender_kind(),
            Err(ProtocolError::UnknownSenderKind(_))
        ));
    }

    #[test]
    fn pack_unpack_roundtrip() {
        let env = Envelope::new("client-1", br#"{"operation":"PING"}"#.to_vec());
        let frames = env.pack();
        let decoded = Envelope::unpack(&frames).unwrap();
        assert_eq!(decoded.sender_id, "client-1");
        assert_eq!(decoded.body, env.body);
    }

    #[test]
    fn unpack_rejects_short_frame_sets() {
        let frames = vec![b"client-1".to_vec()];
        assert!(matches!(
            Envelope::unpack(&frames),
            Err(ProtocolError::InvalidFrameCount { .. })
        ));
    }
}
