// ABOUTME: SMPP v3.4 generic_nack PDU
// ABOUTME: Sent in reply to requests that cannot be decoded or are not supported

use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;

/// GenericNack is used to acknowledge the receipt of a PDU when the receiving
/// entity cannot process the PDU due to errors such as invalid command_id,
/// invalid command_status, or other format errors.
///
/// It has no body. When the offending PDU's sequence_number could not be read
/// the nack carries 0.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    /// The command_status field indicates the reason for the generic_nack
    pub command_status: CommandStatus,
    /// The sequence_number from the original PDU that caused the error.
    pub sequence_number: u32,
}

impl GenericNack {
    pub fn new(command_status: CommandStatus, sequence_number: u32) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }

    /// Nack for a PDU whose command_id this side does not handle
    pub fn invalid_command_id(sequence_number: u32) -> Self {
        Self::new(CommandStatus::InvalidCommandId, sequence_number)
    }

    pub fn system_error(sequence_number: u32) -> Self {
        Self::new(CommandStatus::SystemError, sequence_number)
    }
}

impl_header_only_pdu!(GenericNack, CommandId::GenericNack);
