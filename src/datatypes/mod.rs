// ABOUTME: PDU types and protocol enums for an SMPP v3.4 transceiver
// ABOUTME: Re-exports every PDU and field type used by the codec and the session

mod bind_transceiver;
mod command_id;
mod command_status;
mod data_coding;
mod deliver_sm;
mod enquire_link;
mod esm_class;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod submit_sm;
mod tlv;
mod type_of_number;
mod unbind;

pub use bind_transceiver::{BindTransceiver, BindTransceiverBuilder, BindTransceiverResponse};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use data_coding::DataCoding;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use esm_class::EsmClass;
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use submit_sm::{SubmitSm, SubmitSmBuilder, SubmitSmResponse};
pub use tlv::{Tlv, decode_tlvs, find_tlv};
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};

// Maximum C-Octet string sizes, NUL terminator included (Section 4.4.1)
pub const SERVICE_TYPE_MAX: usize = 6;
pub const ADDRESS_MAX: usize = 21;
pub const TIME_MAX: usize = 17;
pub const MESSAGE_ID_MAX: usize = 65;

/// Largest short_message payload in octets
pub const SHORT_MESSAGE_MAX: usize = 254;
