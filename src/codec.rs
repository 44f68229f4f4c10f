// ABOUTME: SMPP v3.4 codec with the header, the Encodable/Decodable traits and frame parsing
// ABOUTME: Frame and PduRegistry tie the PDU types together for the connection layer

use crate::datatypes::{
    BindTransceiver, BindTransceiverResponse, CommandId, CommandStatus, DeliverSm,
    DeliverSmResponse, EnquireLink, EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse,
    Unbind, UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let command_id = CommandId::try_from(command_id_raw).map_err(|_| {
            CodecError::InvalidCommandId {
                command_id: command_id_raw,
                sequence_number,
            }
        })?;

        // requests must have command_status = 0
        if !command_id.is_response() && command_status != CommandStatus::Ok {
            return Err(CodecError::InvalidRequestStatus {
                command_id,
                command_status,
            });
        }

        // generic_nack may echo 0 when the offending PDU had no readable sequence
        let reserved = sequence_number == 0xFFFF_FFFF
            || (sequence_number == 0 && command_id != CommandId::GenericNack);
        if reserved {
            return Err(CodecError::ReservedSequenceNumber(sequence_number));
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.command_status.code());
        buf.put_u32(self.sequence_number);
        Ok(())
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU to the buffer. The command_length written here may be a
    /// placeholder; `to_bytes` patches it.
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Calculate the encoded size
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }

    /// Encode into a fresh buffer and fix up the command_length field
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;

        let length = buf.len();
        if length > MAX_PDU_SIZE as usize {
            return Err(CodecError::InvalidPduLength {
                length: length as u32,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }
        buf[0..4].copy_from_slice(&(length as u32).to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after header
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {command_id:#x} (sequence {sequence_number})")]
    InvalidCommandId {
        command_id: u32,
        sequence_number: u32,
    },

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Request PDU {command_id:?} has non-zero status: {command_status:?}")]
    InvalidRequestStatus {
        command_id: CommandId,
        command_status: CommandStatus,
    },

    #[error("Reserved sequence number: {0} (0 and 0xFFFFFFFF are reserved)")]
    ReservedSequenceNumber(u32),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl CodecError {
    /// Errors after which the byte stream can no longer be trusted to be
    /// aligned on a frame boundary
    pub fn is_fatal(&self) -> bool {
        matches!(self, CodecError::InvalidPduLength { .. })
    }

    /// Convert codec errors to appropriate SMPP command_status codes
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::InvalidCommandId { .. } => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" => CommandStatus::InvalidMsgLength,
                _ => CommandStatus::SystemError,
            },
            CodecError::TlvError(_) => CommandStatus::ErrorInOptionalPartofPduBody,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a C-Octet string: bytes up to a NUL terminator, at most `max_len`
/// bytes including the terminator.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    let remaining = buf.chunk();
    let window = &remaining[..remaining.len().min(max_len)];

    let end = window
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| CodecError::FieldValidation {
            field: field_name,
            reason: format!("no NUL terminator within {max_len} octets"),
        })?;

    let value = String::from_utf8(window[..end].to_vec()).map_err(|e| CodecError::Utf8Error {
        field: field_name,
        source: e,
    })?;
    buf.advance(end + 1);
    Ok(value)
}

/// Like [`decode_cstring`], but octets that are not UTF-8 (a Latin-1 sender
/// name, say) are replaced rather than rejected. Used for fields the SMSC
/// fills in from the network.
pub fn decode_cstring_lossy(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    let remaining = buf.chunk();
    let window = &remaining[..remaining.len().min(max_len)];

    let end = window
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| CodecError::FieldValidation {
            field: field_name,
            reason: format!("no NUL terminator within {max_len} octets"),
        })?;

    let value = String::from_utf8_lossy(&window[..end]).into_owned();
    buf.advance(end + 1);
    Ok(value)
}

/// Decode the last C-Octet string of a body, where the NUL terminator may be
/// missing. Reads up to the first NUL or the end of the body, whichever comes
/// first.
pub fn decode_trailing_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    let remaining = buf.chunk();
    let (end, consumed) = match remaining.iter().position(|&b| b == 0) {
        Some(nul) => (nul, nul + 1),
        None => (remaining.len(), remaining.len()),
    };
    if end >= max_len {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!("{end} octets exceeds the {} octet limit", max_len - 1),
        });
    }

    let value = String::from_utf8_lossy(&remaining[..end]).into_owned();
    buf.advance(consumed);
    Ok(value)
}

/// Check a value fits a C-Octet field of `max_len` bytes including the NUL
pub fn validate_cstring(
    value: &str,
    max_len: usize,
    field_name: &'static str,
) -> Result<(), CodecError> {
    if value.len() + 1 > max_len {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!("{} octets exceeds the {} octet limit", value.len(), max_len - 1),
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: "embedded NUL".to_string(),
        });
    }
    Ok(())
}

/// Decode exactly `len` raw octets
pub fn decode_octets(
    buf: &mut Cursor<&[u8]>,
    len: usize,
    field_name: &'static str,
) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!("declared {len} octets, {} remain", buf.remaining()),
        });
    }
    Ok(buf.copy_to_bytes(len))
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 32-bit big-endian integer
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32())
}

/// Peek at next 4 bytes without advancing cursor (for command_length)
pub fn peek_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    let pos = buf.position();
    let value = decode_u32(buf)?;
    buf.set_position(pos);
    Ok(value)
}

/// Encode a C-Octet string with its NUL terminator
pub fn encode_cstring(buf: &mut BytesMut, value: &str) {
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
}

/// The PDUs a transceiver session exchanges
#[derive(Debug)]
pub enum Frame {
    BindTransceiver(BindTransceiver),
    BindTransceiverResp(BindTransceiverResponse),

    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),

    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),
    GenericNack(GenericNack),

    /// A well-formed PDU whose body this crate does not decode
    Unknown { header: PduHeader, body: Bytes },

    /// A PDU with a valid header whose body failed to decode. The header is
    /// kept so the PDU can still be answered.
    Malformed { header: PduHeader, error: CodecError },
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

static REGISTRY: LazyLock<PduRegistry> = LazyLock::new(PduRegistry::new);

impl PduRegistry {
    /// Create a new registry with the transceiver PDU set registered
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register_pdu::<BindTransceiver, _>(Frame::BindTransceiver);
        registry.register_pdu::<BindTransceiverResponse, _>(Frame::BindTransceiverResp);

        registry.register_pdu::<SubmitSm, _>(|pdu| Frame::SubmitSm(Box::new(pdu)));
        registry.register_pdu::<SubmitSmResponse, _>(Frame::SubmitSmResp);
        registry.register_pdu::<DeliverSm, _>(|pdu| Frame::DeliverSm(Box::new(pdu)));
        registry.register_pdu::<DeliverSmResponse, _>(Frame::DeliverSmResp);

        registry.register_pdu::<Unbind, _>(Frame::Unbind);
        registry.register_pdu::<UnbindResponse, _>(Frame::UnbindResp);
        registry.register_pdu::<EnquireLink, _>(Frame::EnquireLink);
        registry.register_pdu::<EnquireLinkResponse, _>(Frame::EnquireLinkResp);
        registry.register_pdu::<GenericNack, _>(Frame::GenericNack);

        registry
    }

    fn register_pdu<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let command_id = T::command_id();
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(command_id, decoder);
    }

    /// Decode a PDU given its header and a cursor over exactly its body
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, buf),
            None => {
                let body = buf.copy_to_bytes(buf.remaining());
                Ok(Frame::Unknown { header, body })
            }
        }
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        match self {
            Frame::BindTransceiver(_) => CommandId::BindTransceiver,
            Frame::BindTransceiverResp(_) => CommandId::BindTransceiverResp,
            Frame::SubmitSm(_) => CommandId::SubmitSm,
            Frame::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Frame::DeliverSm(_) => CommandId::DeliverSm,
            Frame::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Frame::Unbind(_) => CommandId::Unbind,
            Frame::UnbindResp(_) => CommandId::UnbindResp,
            Frame::EnquireLink(_) => CommandId::EnquireLink,
            Frame::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Frame::GenericNack(_) => CommandId::GenericNack,
            Frame::Unknown { header, .. } | Frame::Malformed { header, .. } => {
                header.command_id
            }
        }
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::BindTransceiver(pdu) => pdu.sequence_number,
            Frame::BindTransceiverResp(pdu) => pdu.sequence_number,
            Frame::SubmitSm(pdu) => pdu.sequence_number,
            Frame::SubmitSmResp(pdu) => pdu.sequence_number,
            Frame::DeliverSm(pdu) => pdu.sequence_number,
            Frame::DeliverSmResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
            Frame::Unknown { header, .. } | Frame::Malformed { header, .. } => {
                header.sequence_number
            }
        }
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Checks whether a whole frame is buffered and returns its length.
    ///
    /// `Incomplete` means read more. `InvalidPduLength` means the stream is
    /// out of step and the connection must be dropped.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if buf.remaining() < PduHeader::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = peek_u32(buf)?;
        if !(PduHeader::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Decode one frame. The cursor is left at the end of that frame whatever
    /// the outcome, so the caller can carry on with the next one.
    ///
    /// Errors only when the header itself is unusable. A body that fails to
    /// decode comes back as [`Frame::Malformed`].
    pub fn parse(buf: &mut Cursor<&[u8]>) -> Result<Frame, CodecError> {
        let length = Frame::check(buf)?;
        let start = buf.position() as usize;
        let data: &[u8] = buf.get_ref();
        let frame_bytes = &data[start..start + length];
        buf.set_position((start + length) as u64);

        let mut frame = Cursor::new(frame_bytes);
        let header = PduHeader::decode(&mut frame)?;
        match REGISTRY.decode_pdu(header.clone(), &mut frame) {
            Ok(frame) => Ok(frame),
            Err(error) => Ok(Frame::Malformed { header, error }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdu_header_encode_decode() {
        let header = PduHeader {
            command_length: 24,
            command_id: CommandId::EnquireLink,
            command_status: CommandStatus::Ok,
            sequence_number: 42,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();

        assert_eq!(header, decoded);
    }

    #[test]
    fn decode_cstring_stops_at_nul() {
        let data = b"hello\0world\0";
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(decode_cstring(&mut cursor, 16, "test").unwrap(), "hello");
        assert_eq!(cursor.position(), 6);
        assert_eq!(decode_cstring(&mut cursor, 16, "test").unwrap(), "world");
    }

    #[test]
    fn decode_cstring_requires_terminator_within_limit() {
        let data = b"toolongvalue\0";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 6, "system_id");
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "system_id",
                ..
            })
        ));
    }

    #[test]
    fn encode_cstring_appends_nul() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, "hello");
        assert_eq!(buf.as_ref(), b"hello\0");
    }

    #[test]
    fn pdu_header_validation() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x08, // command_length too small
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let mut cursor = Cursor::new(data);
        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(result, Err(CodecError::InvalidPduLength { .. })));

        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x00, // sequence_number (reserved)
        ];
        let mut cursor = Cursor::new(data);
        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(result, Err(CodecError::ReservedSequenceNumber(0))));

        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x00, 0x00, 0x00, 0x15, // enquire_link
            0x00, 0x00, 0x00, 0x08, // non-zero status on a request
            0x00, 0x00, 0x00, 0x01,
        ];
        let mut cursor = Cursor::new(data);
        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(result, Err(CodecError::InvalidRequestStatus { .. })));
    }

    #[test]
    fn command_id_is_response() {
        assert!(!CommandId::EnquireLink.is_response());
        assert!(CommandId::EnquireLinkResp.is_response());
        assert!(!CommandId::SubmitSm.is_response());
        assert!(CommandId::SubmitSmResp.is_response());
        assert!(CommandId::GenericNack.is_response());
    }

    #[test]
    fn check_reports_incomplete_until_whole_frame_buffered() {
        let bytes = EnquireLink::new(1).to_bytes().unwrap();

        let mut cursor = Cursor::new(&bytes[..10]);
        assert!(matches!(Frame::check(&mut cursor), Err(CodecError::Incomplete)));

        let mut cursor = Cursor::new(bytes.as_ref());
        assert_eq!(Frame::check(&mut cursor).unwrap(), 16);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn parse_two_frames_from_one_buffer() {
        let mut data = BytesMut::new();
        data.extend_from_slice(&EnquireLink::new(1).to_bytes().unwrap());
        data.extend_from_slice(&Unbind::new(2).to_bytes().unwrap());

        let mut cursor = Cursor::new(data.as_ref());
        let first = Frame::parse(&mut cursor).unwrap();
        let second = Frame::parse(&mut cursor).unwrap();

        assert!(matches!(first, Frame::EnquireLink(_)));
        assert!(matches!(second, Frame::Unbind(_)));
        assert_eq!(cursor.position() as usize, data.len());
    }

    #[test]
    fn parse_skips_past_malformed_body() {
        let mut data = BytesMut::new();
        // enquire_link claiming a 4 byte body
        data.extend_from_slice(&[
            0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01, 0xDE, 0xAD, 0xBE, 0xEF,
        ]);
        data.extend_from_slice(&EnquireLink::new(2).to_bytes().unwrap());

        let mut cursor = Cursor::new(data.as_ref());
        match Frame::parse(&mut cursor).unwrap() {
            Frame::Malformed { header, error } => {
                assert_eq!(header.command_id, CommandId::EnquireLink);
                assert_eq!(header.sequence_number, 1);
                assert!(!error.is_fatal());
            }
            other => panic!("Expected Malformed frame, got {other:?}"),
        }
        assert_eq!(cursor.position(), 20);

        let next = Frame::parse(&mut cursor).unwrap();
        assert_eq!(next.sequence_number(), 2);
    }

    #[test]
    fn lossy_cstring_keeps_latin1_sender() {
        let data = b"Caf\xE9\0rest";
        let mut cursor = Cursor::new(&data[..]);

        let value = decode_cstring_lossy(&mut cursor, 21, "source_addr").unwrap();
        assert_eq!(value, "Caf\u{FFFD}");
        assert_eq!(cursor.position(), 5);

        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            decode_cstring(&mut cursor, 21, "source_addr"),
            Err(CodecError::Utf8Error { .. })
        ));
    }

    #[test]
    fn trailing_cstring_tolerates_missing_terminator() {
        let mut cursor = Cursor::new(&b"ABC123"[..]);
        assert_eq!(decode_trailing_cstring(&mut cursor, 65, "message_id").unwrap(), "ABC123");
        assert_eq!(cursor.position(), 6);

        let mut cursor = Cursor::new(&b"ABC123\0\x02\x10"[..]);
        assert_eq!(decode_trailing_cstring(&mut cursor, 65, "message_id").unwrap(), "ABC123");
        assert_eq!(cursor.position(), 7);

        let mut cursor = Cursor::new(&b"toolong"[..]);
        assert!(matches!(
            decode_trailing_cstring(&mut cursor, 4, "message_id"),
            Err(CodecError::FieldValidation { field: "message_id", .. })
        ));
    }

    #[test]
    fn unsupported_command_decodes_as_unknown() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x14, // command_length
            0x00, 0x00, 0x00, 0x03, // query_sm
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x07, // sequence_number
            0x01, 0x02, 0x03, 0x04, // body
        ];
        let mut cursor = Cursor::new(data);

        match Frame::parse(&mut cursor).unwrap() {
            Frame::Unknown { header, body } => {
                assert_eq!(header.command_id, CommandId::QuerySm);
                assert_eq!(body.as_ref(), &[0x01, 0x02, 0x03, 0x04]);
            }
            other => panic!("Expected Unknown frame, got {other:?}"),
        }
    }

    #[test]
    fn unassigned_command_id_is_not_fatal() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, 0x00, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x09,
        ];
        let mut cursor = Cursor::new(data);
        let err = Frame::parse(&mut cursor).unwrap_err();

        assert!(matches!(
            err,
            CodecError::InvalidCommandId {
                command_id: 0x0001_0200,
                sequence_number: 9
            }
        ));
        assert!(!err.is_fatal());
        assert_eq!(err.to_command_status(), CommandStatus::InvalidCommandId);
    }

    #[test]
    fn registry_has_transceiver_set() {
        let registry = PduRegistry::new();
        for id in [
            CommandId::BindTransceiver,
            CommandId::BindTransceiverResp,
            CommandId::SubmitSm,
            CommandId::SubmitSmResp,
            CommandId::DeliverSm,
            CommandId::DeliverSmResp,
            CommandId::Unbind,
            CommandId::UnbindResp,
            CommandId::EnquireLink,
            CommandId::EnquireLinkResp,
            CommandId::GenericNack,
        ] {
            assert!(registry.is_registered(id), "{id:?} not registered");
        }
        assert!(!registry.is_registered(CommandId::QuerySm));
    }
}
