//! The Worker's sole socket owner (spec.md §4.4, §5, §9 "Thread-safety
//! on the Worker outbound path"). Inbound frames are decoded here and
//! handed to handler tasks; handler tasks never touch the socket
//! directly, they push finished responses into an MPSC queue this task
//! drains.

use faas_protocol::transport::{dealer_envelope_message, decode_dealer_message};
use tokio::sync::mpsc;
use tracing::{error, warn};
use zeromq::{DealerSocket, Socket, SocketRecv, SocketSend};

pub type OutboundSender = mpsc::UnboundedSender<Vec<u8>>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// Runs until `stop` fires, alternately draining inbound socket frames
/// (handed to `on_message`) and the outbound queue (written straight to
/// the socket, wrapped in this Worker's own `[sender_id][empty][json]`
/// envelope). This is the only task that ever calls `socket.send` or
/// `socket.recv` (spec.md §9).
pub async fn run<F>(
    worker_id: String,
    mut socket: DealerSocket,
    mut outbound_rx: OutboundReceiver,
    mut stop: tokio::sync::watch::Receiver<bool>,
    mut on_message: F,
) where
    F: FnMut(Vec<u8>),
{
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
                    Some(body) => {
                        if let Err(e) = socket.send(dealer_envelope_message(&worker_id, &body)).await {
                            error!("failed to send to director: {e}");
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Ok(msg) => match decode_dealer_message(msg) {
                        Ok(body) => on_message(body),
                        Err(e) => warn!("dropping malformed frame from director: {e}"),
                    },
                    Err(e) => {
                        error!("director socket recv error: {e}");
                        break;
                    }
                }
            }
        }
    }
}

pub async fn connect(director_addr: &str) -> anyhow::Result<DealerSocket> {
    let mut socket = DealerSocket::new();
    socket.connect(director_addr).await?;
    Ok(socket)
}
