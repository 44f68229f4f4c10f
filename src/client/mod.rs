// ABOUTME: Transceiver client built from a session, its listener and the correlator

//! SMPP client session.
//!
//! A [`Session`] owns one TCP connection bound as transceiver. Sends are
//! written from the caller's task; a listener task owns the read half and
//! resolves `submit_sm_resp`, delivery receipts, `enquire_link` and
//! `generic_nack` into the [`Correlator`].
//!
//! ```rust,no_run
//! use smpp_dispatch::billing::NoopBilling;
//! use smpp_dispatch::client::{SendRequest, Session};
//! use smpp_dispatch::config::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("smpp.yaml")?;
//! let credentials = config.credentials();
//! let session = Session::new(config, NoopBilling::default());
//!
//! session.connect().await?;
//! session.bind(&credentials).await?;
//!
//! let outcome = session
//!     .send(SendRequest::new("523317953591", "Hello!"))
//!     .await?;
//! println!("{} {:?}", outcome.status, outcome.carrier_message_id);
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod correlator;
pub mod error;
pub mod keepalive;
mod listener;
pub mod receipt;
pub mod sequence;
pub mod session;
pub mod types;

pub use correlator::{Correlator, PendingHandle, Registration, StatusChange};
pub use error::{SmppError, SmppResult};
pub use keepalive::{KeepAliveAction, KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
pub use receipt::{DeliveryReceipt, DeliveryState};
pub use sequence::SequenceGenerator;
pub use session::{Session, SubmitOptions};
pub use types::{BindCredentials, MessageStatus, SendOutcome, SendRequest, SessionState};
