// ABOUTME: SMPP v3.4 transceiver client that takes one SMS from text to a final delivery status
// ABOUTME: Segments text, submits it, correlates receipts and reports status changes to billing

//! SMPP v3.4 transceiver client for sending SMS through a carrier SMSC.
//!
//! The crate is layered bottom-up:
//!
//! * [`datatypes`] and [`codec`] encode and decode the PDUs a transceiver
//!   session exchanges, with length-prefixed framing.
//! * [`connection`] splits a TCP stream into a frame reader and writer.
//! * [`encoder`] turns text into GSM 7-bit or UCS-2 segments with
//!   concatenation headers.
//! * [`client`] binds, submits, and tracks each message through
//!   `submit_sm_resp` and its delivery receipt.
//! * [`billing`] prices messages and is told about status changes.
//! * [`config`] loads all of the above from YAML or the environment.

mod macros;

pub mod billing;
pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod datatypes;
pub mod encoder;

#[cfg(test)]
mod tests;

pub use billing::{BillingGateway, HttpBillingGateway, NoopBilling};
pub use client::{
    BindCredentials, MessageStatus, SendOutcome, SendRequest, Session, SessionState, SmppError,
    SmppResult,
};
pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};
pub use config::{Config, ConfigError};
pub use encoder::{Encoder, EncodingError, Segment};

/// Error returned by the binary's top level.
///
/// Library code returns the typed errors of each layer; this boxed form only
/// collects them where any of them can surface.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for the binary's top level.
pub type Result<T> = std::result::Result<T, Error>;
