// ABOUTME: Value types for the session API
// ABOUTME: Credentials, send requests, message statuses and outcomes

use crate::datatypes::InterfaceVersion;
use serde::Serialize;
use std::fmt;

/// Credentials used for bind_transceiver
#[derive(Debug, Clone)]
pub struct BindCredentials {
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub interface_version: InterfaceVersion,
}

impl BindCredentials {
    pub fn new(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
        }
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn with_version(mut self, interface_version: InterfaceVersion) -> Self {
        self.interface_version = interface_version;
        self
    }
}

/// One logical message to send
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub destination: String,
    pub text: String,
    /// Overrides the configured source address
    pub source_address: Option<String>,
    pub request_delivery_receipt: bool,
}

impl SendRequest {
    /// A request with a delivery receipt asked for
    pub fn new(destination: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            text: text.into(),
            source_address: None,
            request_delivery_receipt: true,
        }
    }

    pub fn from(mut self, source_address: impl Into<String>) -> Self {
        self.source_address = Some(source_address.into());
        self
    }

    pub fn without_delivery_receipt(mut self) -> Self {
        self.request_delivery_receipt = false;
        self
    }
}

/// Lifecycle of a submitted message.
///
/// `Pending -> Sent -> Delivered` or `Pending -> Failed`. A `Sent` message
/// whose receipt reports a final failure also ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "PENDING",
            MessageStatus::Sent => "SENT",
            MessageStatus::Delivered => "DELIVERED",
            MessageStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `Session::send`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendOutcome {
    pub request_id: u64,
    pub status: MessageStatus,
    pub carrier_message_id: Option<String>,
    pub cost: f64,
    pub segments: usize,
    /// False when the wait ended before a delivery receipt settled the outcome
    pub delivery_confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Bound,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "DISCONNECTED",
            SessionState::Connected => "CONNECTED",
            SessionState::Bound => "BOUND",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_defaults_to_receipt() {
        let request = SendRequest::new("523317953591", "Hi");
        assert!(request.request_delivery_receipt);
        assert!(request.source_address.is_none());

        let request = request.from("ACME").without_delivery_receipt();
        assert_eq!(request.source_address.as_deref(), Some("ACME"));
        assert!(!request.request_delivery_receipt);
    }

    #[test]
    fn outcome_serializes_status_uppercase() {
        let outcome = SendOutcome {
            request_id: 1,
            status: MessageStatus::Delivered,
            carrier_message_id: Some("ABC123".to_string()),
            cost: 0.7,
            segments: 1,
            delivery_confirmed: true,
            reason: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "DELIVERED");
        assert_eq!(json["carrier_message_id"], "ABC123");
        assert!(json.get("reason").is_none());
    }
}
