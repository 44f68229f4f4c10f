// ABOUTME: SMPP v3.4 submit_sm and submit_sm_resp PDUs with a validating builder
// ABOUTME: Each outbound SMS segment is one submit_sm, and the response carries the carrier message id

use crate::codec::CodecError;
use crate::datatypes::{
    CommandId, CommandStatus, DataCoding, EsmClass, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use crate::macros::{builder_setters, impl_message_id_response, impl_short_message_pdu};
use bytes::Bytes;

/// submit_sm (Section 4.4.1): an ESME submits a short message to the SMSC for
/// onward transmission to a specified short message entity.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: String,
    /// UDHI is set when `short_message` starts with a concatenation header
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    /// 0x01 asks the SMSC for a delivery receipt on final outcome
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    /// Up to 254 octets; sm_length is derived from it on encode
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

/// submit_sm_resp (Section 4.4.2). The message_id is the SMSC's handle for
/// the submitted segment and is what a later delivery receipt refers to.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
}

impl_short_message_pdu!(SubmitSm, CommandId::SubmitSm);
impl_message_id_response!(SubmitSmResponse, CommandId::SubmitSmResp);

impl SubmitSm {
    pub fn builder() -> SubmitSmBuilder {
        SubmitSmBuilder::new()
    }
}

/// Builder for creating SubmitSm PDUs with validation and sensible defaults
#[derive(Default)]
pub struct SubmitSmBuilder {
    sequence_number: u32,
    service_type: String,
    source_addr_ton: TypeOfNumber,
    source_addr_npi: NumericPlanIndicator,
    source_addr: String,
    dest_addr_ton: TypeOfNumber,
    dest_addr_npi: NumericPlanIndicator,
    destination_addr: String,
    esm_class: EsmClass,
    registered_delivery: u8,
    data_coding: DataCoding,
    short_message: Bytes,
}

impl SubmitSmBuilder {
    pub fn new() -> Self {
        Self {
            sequence_number: 1,
            ..Default::default()
        }
    }

    builder_setters! {
        sequence_number: u32,
        esm_class: EsmClass,
        data_coding: DataCoding,
    }

    pub fn source(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator, addr: &str) -> Self {
        self.source_addr_ton = ton;
        self.source_addr_npi = npi;
        self.source_addr = addr.to_string();
        self
    }

    pub fn destination(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator, addr: &str) -> Self {
        self.dest_addr_ton = ton;
        self.dest_addr_npi = npi;
        self.destination_addr = addr.to_string();
        self
    }

    pub fn service_type(mut self, service_type: &str) -> Self {
        self.service_type = service_type.to_string();
        self
    }

    pub fn short_message(mut self, short_message: impl Into<Bytes>) -> Self {
        self.short_message = short_message.into();
        self
    }

    pub fn with_delivery_receipt(mut self, requested: bool) -> Self {
        self.registered_delivery = u8::from(requested);
        self
    }

    pub fn build(self) -> Result<SubmitSm, CodecError> {
        let pdu = SubmitSm {
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
            service_type: self.service_type,
            source_addr_ton: self.source_addr_ton,
            source_addr_npi: self.source_addr_npi,
            source_addr: self.source_addr,
            dest_addr_ton: self.dest_addr_ton,
            dest_addr_npi: self.dest_addr_npi,
            destination_addr: self.destination_addr,
            esm_class: self.esm_class,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: self.registered_delivery,
            replace_if_present_flag: 0,
            data_coding: self.data_coding,
            sm_default_msg_id: 0,
            short_message: self.short_message,
            tlvs: Vec::new(),
        };
        pdu.validate()?;
        Ok(pdu)
    }
}
