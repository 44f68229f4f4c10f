// ABOUTME: SMPP v3.4 numeric_plan_indicator (NPI) values for addresses

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum NumericPlanIndicator {
    #[default]
    Unknown = 0b0000_0000,
    Isdn = 0b0000_0001,
    Data = 0b0000_0011,
    Telex = 0b0000_0100,
    LandMobile = 0b0000_0110,
    National = 0b0000_1000,
    Private = 0b0000_1001,
    Ermes = 0b0000_1010,
    Internet = 0b0000_1110,
    WapClientId = 0b0001_0010,
}
