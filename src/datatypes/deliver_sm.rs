// ABOUTME: SMPP v3.4 deliver_sm and deliver_sm_resp PDUs
// ABOUTME: Carries delivery receipts and mobile-originated messages from the SMSC

use crate::datatypes::{
    CommandId, CommandStatus, DataCoding, EsmClass, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use crate::macros::{impl_message_id_response, impl_short_message_pdu};
use bytes::Bytes;

/// deliver_sm (Section 4.6.1): issued by the SMSC to deliver a mobile
/// originated message or an SMSC delivery receipt. Receipts are flagged by
/// `esm_class` and usually carry `receipted_message_id` and `message_state`
/// TLVs alongside the text form in `short_message`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: String,
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

/// deliver_sm_resp (Section 4.6.2). message_id is unused and sent as NUL.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
}

impl_short_message_pdu!(DeliverSm, CommandId::DeliverSm);
impl_message_id_response!(DeliverSmResponse, CommandId::DeliverSmResp);

impl DeliverSm {
    /// A delivery receipt as an SMSC would send it
    pub fn receipt(sequence_number: u32, text: &str, tlvs: Vec<Tlv>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::International,
            source_addr_npi: NumericPlanIndicator::Isdn,
            source_addr: String::new(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: String::new(),
            esm_class: EsmClass::new(EsmClass::DELIVERY_RECEIPT),
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: DataCoding::Default,
            sm_default_msg_id: 0,
            short_message: Bytes::copy_from_slice(text.as_bytes()),
            tlvs,
        }
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class.is_delivery_receipt()
    }

    /// Text form of short_message, lossy for non UTF-8 bytes
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.short_message).into_owned()
    }
}
