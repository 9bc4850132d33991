//! Wire protocol for the Director <-> Worker <-> Client dispatch plane.
//!
//! # Transport
//!
//! Every logical message is a 3-frame envelope over a ROUTER/DEALER
//! socket pair: `[sender_id][empty][json_body]`. `sender_id` begins with
//! `client-` or `worker-`. Each DEALER (Client/Worker) sends this
//! envelope as its own payload; see `transport` for how the ROUTER
//! side's extra, zmq-assigned routing frame is handled underneath it.
//! The body is a JSON document whose shape depends on `operation` /
//! `director_operation`.

pub mod defaults;
pub mod envelope;
pub mod error;
pub mod errors;
pub mod func_id;
pub mod transport;
pub mod types;
pub mod value;

pub use envelope::Envelope;
pub use error::{ProtocolError, Result};
pub use errors::ErrorKind;
pub use func_id::compute_func_id;
pub use value::ArgValue;
