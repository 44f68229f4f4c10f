// ABOUTME: SMPP v3.4 esm_class bit field
// ABOUTME: Marks delivery receipts on inbound deliver_sm and UDHI on concatenated submit_sm

/// esm_class (Section 5.2.12). Only the bits this crate acts on get names;
/// everything else is carried through as-is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EsmClass(u8);

impl EsmClass {
    /// Bits 5-2 = 0001: the deliver_sm carries an SMSC delivery receipt
    pub const DELIVERY_RECEIPT: u8 = 0x04;
    /// Bit 6: short_message begins with a user data header
    pub const UDHI: u8 = 0x40;

    const MESSAGE_TYPE_MASK: u8 = 0x3C;

    pub fn new(raw: u8) -> Self {
        EsmClass(raw)
    }

    pub fn with_udhi(self) -> Self {
        EsmClass(self.0 | Self::UDHI)
    }

    pub fn has_udhi(&self) -> bool {
        self.0 & Self::UDHI != 0
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.0 & Self::MESSAGE_TYPE_MASK == Self::DELIVERY_RECEIPT
    }

    pub fn to_byte(self) -> u8 {
        self.0
    }
}

impl From<u8> for EsmClass {
    fn from(value: u8) -> Self {
        EsmClass(value)
    }
}
