// ABOUTME: SMPP v3.4 bind_transceiver and bind_transceiver_resp PDUs
// ABOUTME: Opens a session that can both submit messages and receive receipts

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_trailing_cstring,
    decode_u8, encode_cstring, validate_cstring,
};
use crate::datatypes::tlv::{Tlv, decode_tlvs, find_tlv};
use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, TypeOfNumber,
};
use crate::macros::builder_setters;
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// BindTransceiver is used to bind a transceiver ESME to the SMSC.
/// A transceiver ESME can both send and receive messages through a single connection.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiver {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.1 system_id: identification of the ESME requesting to bind.
    ///       Up to 15 characters plus the NUL terminator.
    pub system_id: String,

    /// 5.2.2 password: up to 8 characters. An empty password is sent as a
    ///       single NUL.
    pub password: String,

    /// 5.2.3 system_type: category of ESME, up to 12 characters.
    pub system_type: String,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: SME addresses served by this ESME, up to 40
    ///       characters.
    pub address_range: String,
}

/// bind_transceiver_resp. A rejected bind may come back without a body.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub system_id: String,
    pub sc_interface_version: Option<Tlv>,
}

impl BindTransceiver {
    pub const SYSTEM_ID_MAX: usize = 16;
    pub const PASSWORD_MAX: usize = 9;
    pub const SYSTEM_TYPE_MAX: usize = 13;
    pub const ADDRESS_RANGE_MAX: usize = 41;

    pub fn builder() -> BindTransceiverBuilder {
        BindTransceiverBuilder::new()
    }

    /// Checks the variable length fields against their wire limits
    pub fn validate(&self) -> Result<(), CodecError> {
        validate_cstring(&self.system_id, Self::SYSTEM_ID_MAX, "system_id")?;
        validate_cstring(&self.password, Self::PASSWORD_MAX, "password")?;
        validate_cstring(&self.system_type, Self::SYSTEM_TYPE_MAX, "system_type")?;
        validate_cstring(&self.address_range, Self::ADDRESS_RANGE_MAX, "address_range")?;
        Ok(())
    }
}

pub struct BindTransceiverBuilder {
    sequence_number: u32,
    system_id: String,
    password: String,
    system_type: String,
    interface_version: InterfaceVersion,
    addr_ton: TypeOfNumber,
    addr_npi: NumericPlanIndicator,
    address_range: String,
}

impl Default for BindTransceiverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BindTransceiverBuilder {
    pub fn new() -> Self {
        Self {
            sequence_number: 1,
            system_id: String::new(),
            password: String::new(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    builder_setters! {
        sequence_number: u32,
        interface_version: InterfaceVersion,
        addr_ton: TypeOfNumber,
        addr_npi: NumericPlanIndicator,
    }

    pub fn system_id(mut self, system_id: &str) -> Self {
        self.system_id = system_id.to_string();
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn system_type(mut self, system_type: &str) -> Self {
        self.system_type = system_type.to_string();
        self
    }

    pub fn address_range(mut self, address_range: &str) -> Self {
        self.address_range = address_range.to_string();
        self
    }

    pub fn build(self) -> Result<BindTransceiver, CodecError> {
        let pdu = BindTransceiver {
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
            system_id: self.system_id,
            password: self.password,
            system_type: self.system_type,
            interface_version: self.interface_version,
            addr_ton: self.addr_ton,
            addr_npi: self.addr_npi,
            address_range: self.address_range,
        };
        pdu.validate()?;
        Ok(pdu)
    }
}

impl Encodable for BindTransceiver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::BindTransceiver,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id);
        encode_cstring(buf, &self.password);
        encode_cstring(buf, &self.system_type);
        buf.put_u8(self.interface_version as u8);
        buf.put_u8(self.addr_ton as u8);
        buf.put_u8(self.addr_npi as u8);
        encode_cstring(buf, &self.address_range);
        Ok(())
    }
}

impl Decodable for BindTransceiver {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = decode_cstring(buf, Self::SYSTEM_ID_MAX, "system_id")?;
        let password = decode_cstring(buf, Self::PASSWORD_MAX, "password")?;
        let system_type = decode_cstring(buf, Self::SYSTEM_TYPE_MAX, "system_type")?;
        let interface_version = InterfaceVersion::try_from(decode_u8(buf)?).map_err(|e| {
            CodecError::FieldValidation {
                field: "interface_version",
                reason: e.to_string(),
            }
        })?;
        let addr_ton = TypeOfNumber::try_from(decode_u8(buf)?).map_err(|e| {
            CodecError::FieldValidation {
                field: "addr_ton",
                reason: e.to_string(),
            }
        })?;
        let addr_npi = NumericPlanIndicator::try_from(decode_u8(buf)?).map_err(|e| {
            CodecError::FieldValidation {
                field: "addr_npi",
                reason: e.to_string(),
            }
        })?;
        let address_range = decode_cstring(buf, Self::ADDRESS_RANGE_MAX, "address_range")?;

        Ok(BindTransceiver {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl BindTransceiverResponse {
    pub fn new(sequence_number: u32, system_id: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.to_string(),
            sc_interface_version: None,
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            system_id: String::new(),
            sc_interface_version: None,
        }
    }
}

impl Encodable for BindTransceiverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        validate_cstring(&self.system_id, BindTransceiver::SYSTEM_ID_MAX, "system_id")?;

        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::BindTransceiverResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id);
        if let Some(tlv) = &self.sc_interface_version {
            tlv.encode(buf)?;
        }
        Ok(())
    }
}

impl Decodable for BindTransceiverResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        if !buf.has_remaining() {
            return Ok(Self {
                command_status: header.command_status,
                sequence_number: header.sequence_number,
                system_id: String::new(),
                sc_interface_version: None,
            });
        }

        let system_id = decode_trailing_cstring(buf, BindTransceiver::SYSTEM_ID_MAX, "system_id")?;
        let tlvs = decode_tlvs(buf)?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            sc_interface_version: find_tlv(&tlvs, Tlv::SC_INTERFACE_VERSION).cloned(),
        })
    }
}
