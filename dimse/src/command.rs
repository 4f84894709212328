//! DIMSE command sets: construction, field access and group-length
//! aware encoding.
//!
//! Command sets are always exchanged in Implicit VR Little Endian,
//! with `(0000,0000) CommandGroupLength` filled in at encoding time.

use pacs_core::{PrimitiveValue, VR};
use pacs_dictionary_std::tags;
use pacs_object::{read_dataset, write_dataset, DataElement, InMemObject};
use pacs_transfer_syntax_registry::entries::IMPLICIT_VR_LITTLE_ENDIAN;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};

use crate::status::Status;

/// The value of `(0000,0800) CommandDataSetType` indicating
/// that no data set follows the command set.
pub const DATA_SET_ABSENT: u16 = 0x0101;

/// The value written for `(0000,0800)` when a data set follows.
pub const DATA_SET_PRESENT: u16 = 0x0000;

/// A failure while building, encoding or reading a command set.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("command set has no `{}` field", name))]
    MissingCommandField {
        name: &'static str,
        backtrace: Backtrace,
    },
    #[snafu(display("unrecognized command field {:#06X}", value))]
    UnrecognizedCommandField { value: u16, backtrace: Backtrace },
    #[snafu(display("could not read command field `{}`", name))]
    ReadCommandField {
        name: &'static str,
        #[snafu(backtrace)]
        source: pacs_object::mem::AccessError,
    },
    #[snafu(display("could not encode command set"))]
    EncodeCommandSet {
        #[snafu(backtrace)]
        source: pacs_object::write::Error,
    },
    #[snafu(display("could not decode command set"))]
    DecodeCommandSet {
        #[snafu(backtrace)]
        source: pacs_object::read::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The DIMSE command kinds with their wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandField {
    CStoreRq,
    CStoreRsp,
    CGetRq,
    CGetRsp,
    CFindRq,
    CFindRsp,
    CMoveRq,
    CMoveRsp,
    CEchoRq,
    CEchoRsp,
    NEventReportRq,
    NEventReportRsp,
    NGetRq,
    NGetRsp,
    NSetRq,
    NSetRsp,
    NActionRq,
    NActionRsp,
    NCreateRq,
    NCreateRsp,
    NDeleteRq,
    NDeleteRsp,
    CCancelRq,
}

impl CommandField {
    /// The wire value of the command field.
    pub fn as_u16(self) -> u16 {
        use CommandField::*;
        match self {
            CStoreRq => 0x0001,
            CStoreRsp => 0x8001,
            CGetRq => 0x0010,
            CGetRsp => 0x8010,
            CFindRq => 0x0020,
            CFindRsp => 0x8020,
            CMoveRq => 0x0021,
            CMoveRsp => 0x8021,
            CEchoRq => 0x0030,
            CEchoRsp => 0x8030,
            NEventReportRq => 0x0100,
            NEventReportRsp => 0x8100,
            NGetRq => 0x0110,
            NGetRsp => 0x8110,
            NSetRq => 0x0120,
            NSetRsp => 0x8120,
            NActionRq => 0x0130,
            NActionRsp => 0x8130,
            NCreateRq => 0x0140,
            NCreateRsp => 0x8140,
            NDeleteRq => 0x0150,
            NDeleteRsp => 0x8150,
            CCancelRq => 0x0FFF,
        }
    }

    /// Resolve a wire value to a command field.
    pub fn from_u16(value: u16) -> Option<Self> {
        use CommandField::*;
        match value {
            0x0001 => Some(CStoreRq),
            0x8001 => Some(CStoreRsp),
            0x0010 => Some(CGetRq),
            0x8010 => Some(CGetRsp),
            0x0020 => Some(CFindRq),
            0x8020 => Some(CFindRsp),
            0x0021 => Some(CMoveRq),
            0x8021 => Some(CMoveRsp),
            0x0030 => Some(CEchoRq),
            0x8030 => Some(CEchoRsp),
            0x0100 => Some(NEventReportRq),
            0x8100 => Some(NEventReportRsp),
            0x0110 => Some(NGetRq),
            0x8110 => Some(NGetRsp),
            0x0120 => Some(NSetRq),
            0x8120 => Some(NSetRsp),
            0x0130 => Some(NActionRq),
            0x8130 => Some(NActionRsp),
            0x0140 => Some(NCreateRq),
            0x8140 => Some(NCreateRsp),
            0x0150 => Some(NDeleteRq),
            0x8150 => Some(NDeleteRsp),
            0x0FFF => Some(CCancelRq),
            _ => None,
        }
    }

    /// Whether this is a request (as opposed to a response).
    pub fn is_request(self) -> bool {
        self.as_u16() & 0x8000 == 0
    }
}

/// The priority of a composite request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_u16(self) -> u16 {
        match self {
            Priority::Low => 0x0002,
            Priority::Medium => 0x0000,
            Priority::High => 0x0001,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Counts of sub-operations reported by C-MOVE and C-GET responses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubOperationCounts {
    pub remaining: u16,
    pub completed: u16,
    pub failed: u16,
    pub warning: u16,
}

/// A DIMSE command set: a group 0000 dataset with typed access
/// to the fields this suite exchanges.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSet(InMemObject);

impl CommandSet {
    /// Wrap an already decoded command dataset.
    pub fn from_object(obj: InMemObject) -> Self {
        CommandSet(obj)
    }

    /// Access the underlying dataset.
    pub fn object(&self) -> &InMemObject {
        &self.0
    }

    fn new(field: CommandField) -> Self {
        let mut obj = InMemObject::new_empty();
        obj.put(DataElement::new(
            tags::COMMAND_FIELD,
            VR::US,
            PrimitiveValue::from(field.as_u16()),
        ));
        CommandSet(obj)
    }

    fn with_u16(mut self, tag: pacs_core::Tag, value: u16) -> Self {
        self.0
            .put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
        self
    }

    fn with_uid(mut self, tag: pacs_core::Tag, value: &str) -> Self {
        self.0.put_str(tag, VR::UI, value);
        self
    }

    fn with_ae(mut self, tag: pacs_core::Tag, value: &str) -> Self {
        self.0.put_str(tag, VR::AE, value);
        self
    }

    // -- request constructors --

    /// Build a C-ECHO-RQ.
    pub fn c_echo_rq(message_id: u16) -> Self {
        Self::new(CommandField::CEchoRq)
            .with_uid(tags::AFFECTED_SOP_CLASS_UID, pacs_dictionary_std::uids::VERIFICATION)
            .with_u16(tags::MESSAGE_ID, message_id)
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_ABSENT)
    }

    /// Build a C-STORE-RQ.
    pub fn c_store_rq(
        message_id: u16,
        sop_class_uid: &str,
        sop_instance_uid: &str,
        priority: Priority,
    ) -> Self {
        Self::new(CommandField::CStoreRq)
            .with_uid(tags::AFFECTED_SOP_CLASS_UID, sop_class_uid)
            .with_u16(tags::MESSAGE_ID, message_id)
            .with_u16(tags::PRIORITY, priority.as_u16())
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_PRESENT)
            .with_uid(tags::AFFECTED_SOP_INSTANCE_UID, sop_instance_uid)
    }

    /// Build a C-FIND-RQ; the query identifier travels as the data set.
    pub fn c_find_rq(message_id: u16, sop_class_uid: &str, priority: Priority) -> Self {
        Self::new(CommandField::CFindRq)
            .with_uid(tags::AFFECTED_SOP_CLASS_UID, sop_class_uid)
            .with_u16(tags::MESSAGE_ID, message_id)
            .with_u16(tags::PRIORITY, priority.as_u16())
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_PRESENT)
    }

    /// Build a C-MOVE-RQ towards the given destination AE title.
    pub fn c_move_rq(
        message_id: u16,
        sop_class_uid: &str,
        priority: Priority,
        move_destination: &str,
    ) -> Self {
        Self::new(CommandField::CMoveRq)
            .with_uid(tags::AFFECTED_SOP_CLASS_UID, sop_class_uid)
            .with_u16(tags::MESSAGE_ID, message_id)
            .with_u16(tags::PRIORITY, priority.as_u16())
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_PRESENT)
            .with_ae(tags::MOVE_DESTINATION, move_destination)
    }

    /// Build a C-GET-RQ.
    pub fn c_get_rq(message_id: u16, sop_class_uid: &str, priority: Priority) -> Self {
        Self::new(CommandField::CGetRq)
            .with_uid(tags::AFFECTED_SOP_CLASS_UID, sop_class_uid)
            .with_u16(tags::MESSAGE_ID, message_id)
            .with_u16(tags::PRIORITY, priority.as_u16())
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_PRESENT)
    }

    /// Build a C-CANCEL-RQ for the given original message.
    pub fn c_cancel_rq(message_id_being_responded_to: u16) -> Self {
        Self::new(CommandField::CCancelRq)
            .with_u16(tags::MESSAGE_ID_BEING_RESPONDED_TO, message_id_being_responded_to)
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_ABSENT)
    }

    /// Build an N-CREATE-RQ.
    pub fn n_create_rq(message_id: u16, sop_class_uid: &str, sop_instance_uid: &str) -> Self {
        Self::new(CommandField::NCreateRq)
            .with_uid(tags::AFFECTED_SOP_CLASS_UID, sop_class_uid)
            .with_u16(tags::MESSAGE_ID, message_id)
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_PRESENT)
            .with_uid(tags::AFFECTED_SOP_INSTANCE_UID, sop_instance_uid)
    }

    /// Build an N-SET-RQ.
    pub fn n_set_rq(message_id: u16, sop_class_uid: &str, sop_instance_uid: &str) -> Self {
        Self::new(CommandField::NSetRq)
            .with_uid(tags::REQUESTED_SOP_CLASS_UID, sop_class_uid)
            .with_u16(tags::MESSAGE_ID, message_id)
            .with_u16(tags::COMMAND_DATA_SET_TYPE, DATA_SET_PRESENT)
            .with_uid(tags::REQUESTED_SOP_INSTANCE_UID, sop_instance_uid)
    }

    // -- response constructors --

    /// Build a response echoing the request's message identifier.
    pub fn response(
        field: CommandField,
        request: &CommandSet,
        status: Status,
        has_data: bool,
    ) -> Result<Self> {
        let message_id = request.message_id()?;
        let mut rsp = Self::new(field)
            .with_u16(tags::MESSAGE_ID_BEING_RESPONDED_TO, message_id)
            .with_u16(
                tags::COMMAND_DATA_SET_TYPE,
                if has_data { DATA_SET_PRESENT } else { DATA_SET_ABSENT },
            )
            .with_u16(tags::STATUS, status.0);
        if let Some(uid) = request.affected_sop_class_uid() {
            rsp = rsp.with_uid(tags::AFFECTED_SOP_CLASS_UID, &uid);
        }
        if let Some(uid) = request.affected_sop_instance_uid() {
            rsp = rsp.with_uid(tags::AFFECTED_SOP_INSTANCE_UID, &uid);
        }
        Ok(rsp)
    }

    /// Attach sub-operation counters (C-MOVE/C-GET responses).
    pub fn with_sub_operations(self, counts: SubOperationCounts) -> Self {
        self.with_u16(tags::NUMBER_OF_REMAINING_SUBOPERATIONS, counts.remaining)
            .with_u16(tags::NUMBER_OF_COMPLETED_SUBOPERATIONS, counts.completed)
            .with_u16(tags::NUMBER_OF_FAILED_SUBOPERATIONS, counts.failed)
            .with_u16(tags::NUMBER_OF_WARNING_SUBOPERATIONS, counts.warning)
    }

    /// Attach an error comment to a failure response.
    pub fn with_error_comment(mut self, comment: &str) -> Self {
        self.0.put_str(tags::ERROR_COMMENT, VR::LO, comment);
        self
    }

    // -- field access --

    /// The command field of this command set.
    pub fn command_field(&self) -> Result<CommandField> {
        let value: u16 = self
            .0
            .element(tags::COMMAND_FIELD)
            .and_then(|e| e.to_int())
            .context(ReadCommandFieldSnafu {
                name: "CommandField",
            })?;
        CommandField::from_u16(value).context(UnrecognizedCommandFieldSnafu { value })
    }

    /// The message identifier of a request.
    pub fn message_id(&self) -> Result<u16> {
        self.0
            .element(tags::MESSAGE_ID)
            .and_then(|e| e.to_int())
            .context(ReadCommandFieldSnafu { name: "MessageID" })
    }

    /// The message identifier a response refers to.
    pub fn message_id_being_responded_to(&self) -> Result<u16> {
        self.0
            .element(tags::MESSAGE_ID_BEING_RESPONDED_TO)
            .and_then(|e| e.to_int())
            .context(ReadCommandFieldSnafu {
                name: "MessageIDBeingRespondedTo",
            })
    }

    /// The affected SOP class UID, if present.
    pub fn affected_sop_class_uid(&self) -> Option<String> {
        self.0.string_opt(tags::AFFECTED_SOP_CLASS_UID)
    }

    /// The affected SOP instance UID, if present.
    pub fn affected_sop_instance_uid(&self) -> Option<String> {
        self.0.string_opt(tags::AFFECTED_SOP_INSTANCE_UID)
    }

    /// The requested SOP class UID, if present (N-services).
    pub fn requested_sop_class_uid(&self) -> Option<String> {
        self.0.string_opt(tags::REQUESTED_SOP_CLASS_UID)
    }

    /// The requested SOP instance UID, if present (N-services).
    pub fn requested_sop_instance_uid(&self) -> Option<String> {
        self.0.string_opt(tags::REQUESTED_SOP_INSTANCE_UID)
    }

    /// The status of a response.
    pub fn status(&self) -> Result<Status> {
        let value: u16 = self
            .0
            .element(tags::STATUS)
            .and_then(|e| e.to_int())
            .context(ReadCommandFieldSnafu { name: "Status" })?;
        Ok(Status(value))
    }

    /// The C-MOVE destination AE title.
    pub fn move_destination(&self) -> Result<String> {
        self.0
            .string_opt(tags::MOVE_DESTINATION)
            .context(MissingCommandFieldSnafu {
                name: "MoveDestination",
            })
    }

    /// Whether a data set follows this command set.
    pub fn has_data_set(&self) -> bool {
        match self
            .0
            .get(tags::COMMAND_DATA_SET_TYPE)
            .and_then(|e| e.to_int::<u16>().ok())
        {
            Some(value) => value != DATA_SET_ABSENT,
            None => false,
        }
    }

    /// Encode the command set in Implicit VR Little Endian,
    /// with the command group length element prepended.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        write_dataset(&self.0, &mut body, &IMPLICIT_VR_LITTLE_ENDIAN)
            .context(EncodeCommandSetSnafu)?;

        let mut group = InMemObject::new_empty();
        group.put(DataElement::new(
            tags::COMMAND_GROUP_LENGTH,
            VR::UL,
            PrimitiveValue::from(body.len() as u32),
        ));
        let mut out = Vec::with_capacity(body.len() + 12);
        write_dataset(&group, &mut out, &IMPLICIT_VR_LITTLE_ENDIAN)
            .context(EncodeCommandSetSnafu)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a command set from its Implicit VR Little Endian bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let obj = read_dataset(data, &IMPLICIT_VR_LITTLE_ENDIAN).context(DecodeCommandSetSnafu)?;
        Ok(CommandSet(obj))
    }
}
