// ABOUTME: Delivery receipt parsing from deliver_sm TLVs and the SMPP 3.4 Appendix B text

use crate::datatypes::{DeliverSm, Tlv, find_tlv};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static ID_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bid:([^\s\x00]+)").expect("static regex"));
static STAT_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bstat:([A-Za-z]+)").expect("static regex"));
static ERR_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\berr:([0-9A-Za-z]+)").expect("static regex"));

/// Final or intermediate state reported by a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Enroute,
    Delivered,
    Expired,
    Deleted,
    Undeliverable,
    Accepted,
    Rejected,
    Unknown,
}

impl DeliveryState {
    /// message_state TLV value
    pub fn from_message_state(value: u8) -> Self {
        match value {
            1 => DeliveryState::Enroute,
            2 => DeliveryState::Delivered,
            3 => DeliveryState::Expired,
            4 => DeliveryState::Deleted,
            5 => DeliveryState::Undeliverable,
            6 => DeliveryState::Accepted,
            8 => DeliveryState::Rejected,
            _ => DeliveryState::Unknown,
        }
    }

    /// `stat:` value of a text receipt
    pub fn from_stat(stat: &str) -> Self {
        match stat.to_ascii_uppercase().as_str() {
            "ENROUTE" => DeliveryState::Enroute,
            "DELIVRD" => DeliveryState::Delivered,
            "EXPIRED" => DeliveryState::Expired,
            "DELETED" => DeliveryState::Deleted,
            "UNDELIV" => DeliveryState::Undeliverable,
            "ACCEPTD" => DeliveryState::Accepted,
            "REJECTD" => DeliveryState::Rejected,
            _ => DeliveryState::Unknown,
        }
    }

    pub fn is_delivered(&self) -> bool {
        *self == DeliveryState::Delivered
    }

    /// Final states other than delivered
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DeliveryState::Expired
                | DeliveryState::Deleted
                | DeliveryState::Undeliverable
                | DeliveryState::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Enroute => "ENROUTE",
            DeliveryState::Delivered => "DELIVRD",
            DeliveryState::Expired => "EXPIRED",
            DeliveryState::Deleted => "DELETED",
            DeliveryState::Undeliverable => "UNDELIV",
            DeliveryState::Accepted => "ACCEPTD",
            DeliveryState::Rejected => "REJECTD",
            DeliveryState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub carrier_message_id: String,
    pub state: DeliveryState,
    /// network_error_code TLV, else the `err:` field of the text body
    pub error_code: Option<String>,
}

impl DeliveryReceipt {
    /// Parse the receipt carried by `pdu`.
    ///
    /// Returns `None` when the PDU is not a receipt or names no message id.
    pub fn parse(pdu: &DeliverSm) -> Option<Self> {
        if !pdu.is_delivery_receipt() {
            return None;
        }

        let text = pdu.text();

        let carrier_message_id = find_tlv(&pdu.tlvs, Tlv::RECEIPTED_MESSAGE_ID)
            .and_then(Tlv::as_cstring)
            .map(|id| trim_id(&id).to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| capture(&ID_FIELD, &text).map(|id| trim_id(&id).to_string()))?;

        let state = find_tlv(&pdu.tlvs, Tlv::MESSAGE_STATE)
            .and_then(Tlv::as_u8)
            .map(DeliveryState::from_message_state)
            .or_else(|| capture(&STAT_FIELD, &text).map(|s| DeliveryState::from_stat(&s)))
            .unwrap_or(DeliveryState::Unknown);

        let error_code = find_tlv(&pdu.tlvs, Tlv::NETWORK_ERROR_CODE)
            .and_then(network_error_code)
            .or_else(|| capture(&ERR_FIELD, &text));

        Some(DeliveryReceipt {
            carrier_message_id,
            state,
            error_code,
        })
    }
}

// network type octet followed by a 16-bit error code
fn network_error_code(tlv: &Tlv) -> Option<String> {
    match tlv.value.as_ref() {
        [_network_type, high, low] => Some(format!("{:03}", u16::from_be_bytes([*high, *low]))),
        _ => None,
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn trim_id(id: &str) -> &str {
    id.trim_matches(|c: char| c == '\0' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::EsmClass;

    const TEXT: &str =
        "id:ABC123 sub:001 dlvrd:001 submit date:2401011200 done date:2401011201 stat:DELIVRD err:000 text:Hi";

    #[test]
    fn text_only_receipt() {
        let pdu = DeliverSm::receipt(1, TEXT, vec![]);
        let receipt = DeliveryReceipt::parse(&pdu).unwrap();

        assert_eq!(receipt.carrier_message_id, "ABC123");
        assert_eq!(receipt.state, DeliveryState::Delivered);
        assert_eq!(receipt.error_code.as_deref(), Some("000"));
    }

    #[test]
    fn tlvs_take_precedence_over_text() {
        let pdu = DeliverSm::receipt(
            1,
            TEXT,
            vec![
                Tlv::cstring(Tlv::RECEIPTED_MESSAGE_ID, "XYZ789"),
                Tlv::u8(Tlv::MESSAGE_STATE, 5),
            ],
        );
        let receipt = DeliveryReceipt::parse(&pdu).unwrap();

        assert_eq!(receipt.carrier_message_id, "XYZ789");
        assert_eq!(receipt.state, DeliveryState::Undeliverable);
        assert!(receipt.state.is_failure());
    }

    #[test]
    fn network_error_code_tlv_supplies_error_code() {
        let pdu = DeliverSm::receipt(
            1,
            TEXT,
            vec![
                Tlv::cstring(Tlv::RECEIPTED_MESSAGE_ID, "ABC123"),
                Tlv::u8(Tlv::MESSAGE_STATE, 5),
                Tlv::new(Tlv::NETWORK_ERROR_CODE, vec![0x03, 0x00, 0x0B]),
            ],
        );
        let receipt = DeliveryReceipt::parse(&pdu).unwrap();
        assert_eq!(receipt.error_code.as_deref(), Some("011"));

        // a value of the wrong size falls back to the text
        let pdu = DeliverSm::receipt(
            1,
            TEXT,
            vec![Tlv::new(Tlv::NETWORK_ERROR_CODE, vec![0x0B])],
        );
        let receipt = DeliveryReceipt::parse(&pdu).unwrap();
        assert_eq!(receipt.error_code.as_deref(), Some("000"));
    }

    #[test]
    fn message_state_two_is_delivered() {
        let pdu = DeliverSm::receipt(
            1,
            "",
            vec![
                Tlv::cstring(Tlv::RECEIPTED_MESSAGE_ID, "55"),
                Tlv::u8(Tlv::MESSAGE_STATE, 2),
            ],
        );
        let receipt = DeliveryReceipt::parse(&pdu).unwrap();
        assert!(receipt.state.is_delivered());
        assert_eq!(receipt.error_code, None);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let pdu = DeliverSm::receipt(1, "ID:q1 SUB:001 STAT:expired ERR:001", vec![]);
        let receipt = DeliveryReceipt::parse(&pdu).unwrap();
        assert_eq!(receipt.carrier_message_id, "q1");
        assert_eq!(receipt.state, DeliveryState::Expired);
    }

    #[test]
    fn non_final_states() {
        for stat in ["ENROUTE", "ACCEPTD", "BOGUS"] {
            let state = DeliveryState::from_stat(stat);
            assert!(!state.is_delivered());
            assert!(!state.is_failure());
        }
    }

    #[test]
    fn mobile_originated_message_is_not_a_receipt() {
        let mut pdu = DeliverSm::receipt(1, TEXT, vec![]);
        pdu.esm_class = EsmClass::new(0);
        assert!(DeliveryReceipt::parse(&pdu).is_none());
    }

    #[test]
    fn receipt_without_id_is_ignored() {
        let pdu = DeliverSm::receipt(1, "stat:DELIVRD", vec![]);
        assert!(DeliveryReceipt::parse(&pdu).is_none());
    }
}
