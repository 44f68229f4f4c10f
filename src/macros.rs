// ABOUTME: Macros that generate encode/decode impls and builder setters for PDUs
// ABOUTME: Cover header-only PDUs, short-message PDUs and message-id responses

/// Implements `Decodable` and `Encodable` for a PDU that is nothing but the
/// 16 byte header (enquire_link, unbind, generic_nack and their responses).
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                if buf.has_remaining() {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: concat!(stringify!($pdu_type), "_body"),
                        reason: concat!(stringify!($pdu_type), " PDU should have no body")
                            .to_string(),
                    });
                }

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                let header = $crate::codec::PduHeader {
                    command_length: $crate::codec::PduHeader::SIZE as u32,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf)
            }

            fn encoded_size(&self) -> usize {
                $crate::codec::PduHeader::SIZE
            }
        }
    };
}

/// `new(sequence_number)` with an Ok status and `error(sequence_number, status)`
macro_rules! impl_header_only_constructors {
    ($pdu_type:ident) => {
        impl $pdu_type {
            /// Create a new PDU with Ok status
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            /// Create a PDU with error status
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }
    };
}

/// Codec implementation plus constructors for a header-only PDU
macro_rules! impl_complete_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        $crate::macros::impl_header_only_pdu!($pdu_type, $command_id);
        $crate::macros::impl_header_only_constructors!($pdu_type);
    };
}

/// Fluent `field(mut self, value) -> Self` setters for builders
macro_rules! builder_setters {
    ($($field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

pub(crate) use {
    builder_setters, impl_complete_header_only_pdu, impl_header_only_constructors,
    impl_header_only_pdu,
};

/// Codec for submit_sm and deliver_sm, which share one body layout
/// (Sections 4.4.1 and 4.6.1). Addresses arrive from the network in whatever
/// character set the SMSC uses, so C-Octet strings decode lossily.
macro_rules! impl_short_message_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::encode_cstring;

                self.validate()?;

                let header = $crate::codec::PduHeader {
                    command_length: 0,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf)?;

                encode_cstring(buf, &self.service_type);
                buf.put_u8(self.source_addr_ton as u8);
                buf.put_u8(self.source_addr_npi as u8);
                encode_cstring(buf, &self.source_addr);
                buf.put_u8(self.dest_addr_ton as u8);
                buf.put_u8(self.dest_addr_npi as u8);
                encode_cstring(buf, &self.destination_addr);
                buf.put_u8(self.esm_class.to_byte());
                buf.put_u8(self.protocol_id);
                buf.put_u8(self.priority_flag);
                encode_cstring(buf, &self.schedule_delivery_time);
                encode_cstring(buf, &self.validity_period);
                buf.put_u8(self.registered_delivery);
                buf.put_u8(self.replace_if_present_flag);
                buf.put_u8(self.data_coding.to_byte());
                buf.put_u8(self.sm_default_msg_id);
                buf.put_u8(self.short_message.len() as u8);
                buf.put_slice(&self.short_message);
                for tlv in &self.tlvs {
                    tlv.encode(buf)?;
                }
                Ok(())
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring_lossy as decode_cstring, decode_octets, decode_u8};
                use $crate::datatypes::{
                    DataCoding, EsmClass, NumericPlanIndicator, TypeOfNumber, decode_tlvs,
                };

                Self::validate_header(&header)?;

                let service_type = decode_cstring(buf, $crate::datatypes::SERVICE_TYPE_MAX, "service_type")?;
                let source_addr_ton = TypeOfNumber::try_from(decode_u8(buf)?).unwrap_or_default();
                let source_addr_npi =
                    NumericPlanIndicator::try_from(decode_u8(buf)?).unwrap_or_default();
                let source_addr = decode_cstring(buf, $crate::datatypes::ADDRESS_MAX, "source_addr")?;
                let dest_addr_ton = TypeOfNumber::try_from(decode_u8(buf)?).unwrap_or_default();
                let dest_addr_npi =
                    NumericPlanIndicator::try_from(decode_u8(buf)?).unwrap_or_default();
                let destination_addr = decode_cstring(buf, $crate::datatypes::ADDRESS_MAX, "destination_addr")?;
                let esm_class = EsmClass::new(decode_u8(buf)?);
                let protocol_id = decode_u8(buf)?;
                let priority_flag = decode_u8(buf)?;
                let schedule_delivery_time =
                    decode_cstring(buf, $crate::datatypes::TIME_MAX, "schedule_delivery_time")?;
                let validity_period = decode_cstring(buf, $crate::datatypes::TIME_MAX, "validity_period")?;
                let registered_delivery = decode_u8(buf)?;
                let replace_if_present_flag = decode_u8(buf)?;
                let data_coding = DataCoding::from_byte(decode_u8(buf)?);
                let sm_default_msg_id = decode_u8(buf)?;
                let sm_length = decode_u8(buf)? as usize;
                let short_message = decode_octets(buf, sm_length, "short_message")?;
                let tlvs = decode_tlvs(buf)?;

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                    tlvs,
                })
            }
        }

        impl $pdu_type {
            /// Checks the variable length fields against their wire limits
            pub fn validate(&self) -> Result<(), $crate::codec::CodecError> {
                use $crate::codec::{CodecError, validate_cstring};

                validate_cstring(&self.service_type, $crate::datatypes::SERVICE_TYPE_MAX, "service_type")?;
                validate_cstring(&self.source_addr, $crate::datatypes::ADDRESS_MAX, "source_addr")?;
                validate_cstring(&self.destination_addr, $crate::datatypes::ADDRESS_MAX, "destination_addr")?;
                validate_cstring(&self.schedule_delivery_time, $crate::datatypes::TIME_MAX, "schedule_delivery_time")?;
                validate_cstring(&self.validity_period, $crate::datatypes::TIME_MAX, "validity_period")?;
                if self.short_message.len() > $crate::datatypes::SHORT_MESSAGE_MAX {
                    return Err(CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "{} octets exceeds the {} octet limit",
                            self.short_message.len(),
                            $crate::datatypes::SHORT_MESSAGE_MAX
                        ),
                    });
                }
                Ok(())
            }
        }
    };
}

/// Codec for submit_sm_resp and deliver_sm_resp: a message_id C-Octet string
/// that an error response is allowed to omit.
macro_rules! impl_message_id_response {
    ($pdu_type:ident, $command_id:expr) => {
        impl $pdu_type {
            pub fn new(sequence_number: u32, message_id: &str) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    message_id: message_id.to_string(),
                }
            }

            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                    message_id: String::new(),
                }
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::validate_cstring(&self.message_id, $crate::datatypes::MESSAGE_ID_MAX, "message_id")?;

                let header = $crate::codec::PduHeader {
                    command_length: 0,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf)?;
                $crate::codec::encode_cstring(buf, &self.message_id);
                Ok(())
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                // some SMSCs leave off the terminating NUL
                let message_id = if buf.has_remaining() {
                    $crate::codec::decode_trailing_cstring(buf, $crate::datatypes::MESSAGE_ID_MAX, "message_id")?
                } else {
                    String::new()
                };
                // optional parameters on a response are not used
                buf.advance(buf.remaining());

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    message_id,
                })
            }
        }
    };
}

pub(crate) use {impl_message_id_response, impl_short_message_pdu};
