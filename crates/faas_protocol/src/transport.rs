//! ZeroMQ ROUTER/DEALER plumbing shared by the Director and Worker
//! (spec.md §2, §6; SPEC_FULL.md §1). Grounded on the teacher's
//! `casparian_worker::worker::send_message` / `casparian_sentinel`
//! integration tests: a logical message is one `ZmqMessage` built by
//! chaining `push_back` over its frames, sent in a single `.send()`
//! call so the peer always observes the full envelope atomically.
//!
//! spec.md §6 defines the logical envelope as `[sender_id][empty][json]`
//! with `sender_id` carrying the `client-`/`worker-` prefix. The
//! `zeromq` crate's ROUTER socket auto-prepends its own opaque,
//! non-UTF8 per-connection routing id ahead of whatever the DEALER
//! sends: it does not let a DEALER choose that id. So the DEALER here
//! sends the logical envelope *as its own 3-frame payload*
//! (`[sender_id][empty][json]`); on the ROUTER side this arrives as 4
//! frames (`[raw_zmq_id][sender_id][empty][json]`). The Director keeps
//! `raw_zmq_id` only to address replies (`RouterSocket::send` requires
//! it as the destination frame) and uses `sender_id` for everything
//! else. Replies flow back as `[raw_zmq_id][empty][json]`, which the
//! DEALER sees (after ROUTER strips the routing frame) as the 2-frame
//! `[empty][json]`.

use crate::envelope::Envelope;
use crate::error::{ProtocolError, Result};
use zeromq::ZmqMessage;

/// Build the DEALER-side outgoing message: `[sender_id][empty][json]`.
pub fn dealer_envelope_message(sender_id: &str, body: &[u8]) -> ZmqMessage {
    let mut msg = ZmqMessage::from(sender_id.as_bytes().to_vec());
    msg.push_back(Vec::new().into());
    msg.push_back(body.to_vec().into());
    msg
}

/// Build the ROUTER-side reply: `[raw_zmq_id][empty][json]`.
pub fn router_reply_message(raw_zmq_id: &[u8], body: &[u8]) -> ZmqMessage {
    let mut msg = ZmqMessage::from(raw_zmq_id.to_vec());
    msg.push_back(Vec::new().into());
    msg.push_back(body.to_vec().into());
    msg
}

/// Split a ROUTER-received `ZmqMessage` into the zmq routing id (needed
/// only to address a reply) and the decoded logical `Envelope`.
pub fn decode_router_message(msg: ZmqMessage) -> Result<(Vec<u8>, Envelope)> {
    let mut frames: Vec<Vec<u8>> = msg.into_vec().into_iter().map(|b| b.to_vec()).collect();
    if frames.is_empty() {
        return Err(ProtocolError::InvalidFrameCount {
            expected: 4,
            got: 0,
        });
    }
    let raw_zmq_id = frames.remove(0);
    let envelope = Envelope::unpack(&frames)?;
    Ok((raw_zmq_id, envelope))
}

/// Decode a DEALER-received `ZmqMessage` (`[empty][json]`) into the raw
/// JSON body bytes.
pub fn decode_dealer_message(msg: ZmqMessage) -> Result<Vec<u8>> {
    let mut frames: Vec<Vec<u8>> = msg.into_vec().into_iter().map(|b| b.to_vec()).collect();
    if frames.len() < 2 {
        return Err(ProtocolError::InvalidFrameCount {
            expected: 2,
            got: frames.len(),
        });
    }
    Ok(frames.remove(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_message_round_trips_through_envelope() {
        let msg = dealer_envelope_message("worker-1", br#"{"a":1}"#);
        // Simulate the ROUTER's auto-prepended routing frame.
        let mut frames: Vec<Vec<u8>> = msg.into_vec().into_iter().map(|b| b.to_vec()).collect();
        frames.insert(0, b"raw-zmq-id".to_vec());
        let mut wire = ZmqMessage::from(frames.remove(0));
        for f in frames {
            wire.push_back(f.into());
        }
        let (raw_id, env) = decode_router_message(wire).unwrap();
        assert_eq!(raw_id, b"raw-zmq-id".to_vec());
        assert_eq!(env.sender_id, "worker-1");
        assert_eq!(env.body, br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn dealer_message_decodes_body() {
        let msg = router_reply_message(b"raw-zmq-id", br#"{"b":2}"#);
        let body = decode_dealer_message(msg).unwrap();
        assert_eq!(body, br#"{"b":2}"#.to_vec());
    }
}
