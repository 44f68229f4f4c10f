// ABOUTME: Tag-length-value optional parameters appended to PDU bodies
// ABOUTME: Includes the receipt tags for message id, message state and network error code

use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Optional parameter (Section 5.3): a 16-bit tag, a 16-bit length and an
/// opaque value.
#[derive(Clone, Debug, PartialEq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length is written on the wire as the Length field.
    pub value: Bytes,
}

impl Tlv {
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_STATE: u16 = 0x0427;

    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// C-Octet string value, NUL terminated on the wire
    pub fn cstring(tag: u16, value: &str) -> Self {
        let mut bytes = BytesMut::with_capacity(value.len() + 1);
        bytes.put_slice(value.as_bytes());
        bytes.put_u8(0);
        Self::new(tag, bytes.freeze())
    }

    pub fn u8(tag: u16, value: u8) -> Self {
        Self::new(tag, vec![value])
    }

    /// Value read as a C-Octet string with trailing NULs removed
    pub fn as_cstring(&self) -> Option<String> {
        let end = self
            .value
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.value.len());
        std::str::from_utf8(&self.value[..end])
            .ok()
            .map(str::to_string)
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.value.first().copied()
    }

    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len())
            .map_err(|_| CodecError::TlvError(format!("value too long for tag {:#06x}", self.tag)))?;
        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::TlvError("truncated TLV header".to_string()));
        }
        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(CodecError::TlvError(format!(
                "tag {tag:#06x} declares {length} bytes, {} remain",
                buf.remaining()
            )));
        }
        let value = buf.copy_to_bytes(length);
        Ok(Self { tag, value })
    }
}

/// Decode every TLV left in the PDU body
pub fn decode_tlvs(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
    let mut tlvs = Vec::new();
    while buf.has_remaining() {
        tlvs.push(Tlv::decode(buf)?);
    }
    Ok(tlvs)
}

/// First TLV with the given tag
pub fn find_tlv(tlvs: &[Tlv], tag: u16) -> Option<&Tlv> {
    tlvs.iter().find(|tlv| tlv.tag == tag)
}
