// ABOUTME: SMPP v3.4 enquire_link and enquire_link_resp PDUs
// ABOUTME: Used as the keep-alive heartbeat in both directions

use crate::datatypes::CommandId;
use crate::datatypes::CommandStatus;
use crate::macros::impl_complete_header_only_pdu;

/// enquire_link (Section 4.11.1): link confidence check. Either peer may send
/// it at any time once bound; the other side must answer with
/// enquire_link_resp.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

/// enquire_link_resp (Section 4.11.2)
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_complete_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);
