//! The Director's sole ROUTER socket owner (spec.md §4.2, §5). Keeps the
//! mapping from logical `sender_id` to the raw zmq routing frame needed
//! to address a reply: the only place that mapping lives, since this is
//! the only task that ever touches the socket (mirrors the Worker's
//! "transport is the sole socket owner" rule in `faas_worker::transport`).

use faas_protocol::transport::{decode_router_message, router_reply_message};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{error, warn};
use zeromq::{RouterSocket, Socket, SocketRecv, SocketSend};

/// `(destination sender_id, body)`: the router looks up the raw zmq id
/// for `destination` and drops the message with a warning if that
/// connection is no longer known (e.g. the peer disconnected).
pub type OutboundItem = (String, Vec<u8>);
pub type OutboundSender = mpsc::UnboundedSender<OutboundItem>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundItem>;

pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

pub async fn bind(addr: &str) -> anyhow::Result<RouterSocket> {
    let mut socket = RouterSocket::new();
    socket.bind(addr).await?;
    Ok(socket)
}

/// Runs until `stop` fires. `on_message(sender_id, body)` is invoked for
/// every decoded inbound envelope; its job is to kick off a handler task
/// that eventually pushes a reply onto `outbound`.
pub async fn run<F>(
    mut socket: RouterSocket,
    mut outbound_rx: OutboundReceiver,
    mut stop: tokio::sync::watch::Receiver<bool>,
    mut on_message: F,
) where
    F: FnMut(String, Vec<u8>),
{
    let mut raw_id_by_sender: HashMap<String, Vec<u8>> = HashMap::new();

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some((destination, body)) => {
                        match raw_id_by_sender.get(&destination) {
                            Some(raw_id) => {
                                if let Err(e) = socket.send(router_reply_message(raw_id, &body)).await {
                                    error!("failed to send to {destination}: {e}");
                                }
                            }
                            None => warn!("no known connection for sender_id {destination}, dropping reply"),
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Ok(msg) => match decode_router_message(msg) {
                        Ok((raw_id, envelope)) => {
                            raw_id_by_sender.insert(envelope.sender_id.clone(), raw_id);
                            on_message(envelope.sender_id, envelope.body);
                        }
                        Err(e) => warn!("dropping malformed inbound frame: {e}"),
                    },
                    Err(e) => {
                        error!("router socket recv error: {e}");
                        break;
                    }
                }
            }
        }
    }
}
