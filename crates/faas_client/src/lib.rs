//! Thin client SDK for the FaaS dispatch plane (spec.md §1, §2).
//!
//! `FaasClient` opens one DEALER connection to a Director and exposes
//! one async call per wire operation. It carries no retry logic and no
//! state beyond a receive timeout (spec.md §9, Open Questions).

pub mod client;
pub mod error;
pub mod validator;

pub use client::FaasClient;
pub use error::{ClientError, Result};
