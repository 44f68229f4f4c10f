// ABOUTME: SMPP v3.4 data_coding values and per-alphabet segment capacities
// ABOUTME: GSM default is 160 or 153 characters per part, UCS-2 is 70 or 67

use std::fmt;

/// Data coding scheme of a short message (Section 5.2.19).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// SMSC default alphabet, GSM 03.38 7-bit
    #[default]
    Default,
    /// UCS-2 (ISO/IEC-10646), carried as UTF-16BE
    Ucs2,
    /// Any other scheme, kept as the raw byte
    Other(u8),
}

impl DataCoding {
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x00 => DataCoding::Default,
            0x08 => DataCoding::Ucs2,
            other => DataCoding::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            DataCoding::Default => 0x00,
            DataCoding::Ucs2 => 0x08,
            DataCoding::Other(value) => value,
        }
    }

    /// Characters that fit one unsegmented message
    pub fn max_single_sms_length(self) -> usize {
        match self {
            DataCoding::Default => 160,
            DataCoding::Ucs2 => 70,
            DataCoding::Other(_) => 140,
        }
    }

    /// Characters per part once a 6 byte concatenation header is present
    pub fn max_multipart_length(self) -> usize {
        match self {
            DataCoding::Default => 153,
            DataCoding::Ucs2 => 67,
            DataCoding::Other(_) => 134,
        }
    }
}

impl fmt::Debug for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataCoding::Default => write!(f, "DataCoding::Default(0x00)"),
            DataCoding::Ucs2 => write!(f, "DataCoding::Ucs2(0x08)"),
            DataCoding::Other(value) => write!(f, "DataCoding::Other({value:#04x})"),
        }
    }
}

impl From<u8> for DataCoding {
    fn from(value: u8) -> Self {
        DataCoding::from_byte(value)
    }
}

impl From<DataCoding> for u8 {
    fn from(value: DataCoding) -> Self {
        value.to_byte()
    }
}
