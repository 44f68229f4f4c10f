// ABOUTME: SMPP interface_version values sent when binding

use num_enum::TryFromPrimitive;

/// This parameter is used to indicate the version of the SMPP protocol.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    #[default]
    SmppV34 = 0x34,
}
