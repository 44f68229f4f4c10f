// ABOUTME: Splits message text into SMS segments with concatenation headers
// ABOUTME: Chooses GSM 03.38 or UCS-2 for the whole message

//! Message segmentation.
//!
//! The alphabet is chosen for the whole message: if any character falls
//! outside GSM 03.38 (basic or extension table) every segment is UCS-2.
//! Splitting never separates a GSM escape from its code, nor the two halves
//! of a UTF-16 surrogate pair.

pub mod gsm;

use crate::datatypes::DataCoding;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

/// Length of the concatenation user data header, IEI 0x00 with an 8-bit reference
pub const UDH_LEN: usize = 6;

/// Default ceiling on message length in characters, ten GSM parts
pub const DEFAULT_MAX_LENGTH: usize = 1530;

const MAX_PARTS: usize = 255;

static NEXT_REFERENCE: AtomicU8 = AtomicU8::new(0);

#[derive(Debug, Error, PartialEq)]
pub enum EncodingError {
    #[error("message text is empty")]
    Empty,

    #[error("message is {length} characters, limit is {max}")]
    TooLong { length: usize, max: usize },

    #[error("message needs {count} segments, at most 255 are addressable")]
    TooManySegments { count: usize },
}

/// Concatenation metadata, present only on multipart messages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Concatenation {
    pub reference_number: u8,
    pub part_count: u8,
    /// 1-based
    pub part_index: u8,
}

/// One short_message worth of encoded text
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// short_message contents, concatenation header included when present
    pub payload: Bytes,
    pub data_coding: DataCoding,
    pub concatenation: Option<Concatenation>,
}

impl Segment {
    pub fn part_index(&self) -> u8 {
        self.concatenation.map_or(1, |c| c.part_index)
    }

    pub fn part_count(&self) -> u8 {
        self.concatenation.map_or(1, |c| c.part_count)
    }

    pub fn reference_number(&self) -> Option<u8> {
        self.concatenation.map(|c| c.reference_number)
    }

    /// Whether esm_class must carry UDHI
    pub fn has_udh(&self) -> bool {
        self.concatenation.is_some()
    }

    /// Payload without the concatenation header
    pub fn user_data(&self) -> &[u8] {
        if self.has_udh() {
            &self.payload[UDH_LEN..]
        } else {
            &self.payload
        }
    }
}

/// Text segmenter with a configured length ceiling
#[derive(Clone, Debug)]
pub struct Encoder {
    max_length: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LENGTH)
    }
}

// One character's encoded units, with its cost against segment capacity
struct Unit {
    bytes: Vec<u8>,
    cost: usize,
}

impl Encoder {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encode `text` into one or more segments.
    ///
    /// Capacity is counted in septets for GSM and in UTF-16 code units for
    /// UCS-2: 160/153 and 70/67 for single and multipart messages.
    pub fn encode(&self, text: &str) -> Result<Vec<Segment>, EncodingError> {
        if text.is_empty() {
            return Err(EncodingError::Empty);
        }
        let length = text.chars().count();
        if length > self.max_length {
            return Err(EncodingError::TooLong {
                length,
                max: self.max_length,
            });
        }

        let (data_coding, units) = if gsm::is_encodable(text) {
            (DataCoding::Default, gsm_units(text))
        } else {
            (DataCoding::Ucs2, ucs2_units(text))
        };

        let total: usize = units.iter().map(|u| u.cost).sum();
        if total <= data_coding.max_single_sms_length() {
            let payload: Vec<u8> = units.into_iter().flat_map(|u| u.bytes).collect();
            return Ok(vec![Segment {
                payload: Bytes::from(payload),
                data_coding,
                concatenation: None,
            }]);
        }

        let capacity = data_coding.max_multipart_length();
        let mut parts: Vec<Vec<u8>> = Vec::new();
        let mut current = Vec::new();
        let mut used = 0;
        for unit in units {
            if used + unit.cost > capacity {
                parts.push(std::mem::take(&mut current));
                used = 0;
            }
            used += unit.cost;
            current.extend_from_slice(&unit.bytes);
        }
        if !current.is_empty() {
            parts.push(current);
        }

        if parts.len() > MAX_PARTS {
            return Err(EncodingError::TooManySegments { count: parts.len() });
        }

        let reference_number = next_reference();
        let part_count = parts.len() as u8;
        let segments = parts
            .into_iter()
            .enumerate()
            .map(|(i, body)| {
                let concatenation = Concatenation {
                    reference_number,
                    part_count,
                    part_index: (i + 1) as u8,
                };
                let mut payload = BytesMut::with_capacity(UDH_LEN + body.len());
                payload.put_slice(&[
                    0x05,
                    0x00,
                    0x03,
                    reference_number,
                    part_count,
                    concatenation.part_index,
                ]);
                payload.put_slice(&body);
                Segment {
                    payload: payload.freeze(),
                    data_coding,
                    concatenation: Some(concatenation),
                }
            })
            .collect();

        Ok(segments)
    }
}

/// Reassemble the text of a message from its segments, in part order.
pub fn decode(segments: &[Segment]) -> String {
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.part_index());

    let data: Vec<u8> = ordered
        .iter()
        .flat_map(|s| s.user_data().iter().copied())
        .collect();

    match ordered.first().map(|s| s.data_coding) {
        Some(DataCoding::Ucs2) => {
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        Some(DataCoding::Default) => gsm::decode(&data),
        _ => String::from_utf8_lossy(&data).into_owned(),
    }
}

fn next_reference() -> u8 {
    NEXT_REFERENCE.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
}

fn gsm_units(text: &str) -> Vec<Unit> {
    text.chars()
        .filter_map(gsm::encode_char)
        .map(|septets| {
            let mut bytes = Vec::with_capacity(2);
            septets.push_to(&mut bytes);
            Unit {
                cost: septets.len(),
                bytes,
            }
        })
        .collect()
}

fn ucs2_units(text: &str) -> Vec<Unit> {
    let mut buf = [0u16; 2];
    text.chars()
        .map(|c| {
            let encoded = c.encode_utf16(&mut buf);
            Unit {
                cost: encoded.len(),
                bytes: encoded.iter().flat_map(|u| u.to_be_bytes()).collect(),
            }
        })
        .collect()
}
