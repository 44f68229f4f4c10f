// ABOUTME: SMPP v3.4 type_of_number (TON) values for source and destination addresses
// ABOUTME: Alphanumeric senders use TON 5, numeric ones use international

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum TypeOfNumber {
    #[default]
    Unknown = 0b0000_0000,
    International = 0b0000_0001,
    National = 0b0000_0010,
    NetworkSpecific = 0b0000_0011,
    SubscriberNumber = 0b0000_0100,
    Alphanumeric = 0b0000_0101,
    Abbreviated = 0b0000_0110,
}
