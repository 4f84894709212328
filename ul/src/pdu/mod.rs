//! Protocol data unit structures, as laid out in PS3.8 §9.3.

pub mod reader;
pub mod writer;

/// The default maximum PDU size advertised by this implementation.
pub const DEFAULT_MAX_PDU: u32 = 16_384;

/// The minimum maximum-PDU-size a peer may be held to.
pub const MINIMUM_PDU_SIZE: u32 = 4_096;

/// The hard ceiling on incoming PDU sizes,
/// guarding buffer allocation against rogue length fields.
pub const MAXIMUM_PDU_SIZE: u32 = 131_072;

/// The length of the PDU header in bytes:
/// type (1), reserved (1) and length (4, big endian).
pub const PDU_HEADER_SIZE: u32 = 6;

/// A presentation context as proposed in an A-ASSOCIATE-RQ.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PresentationContextProposed {
    /// context identifier, odd, unique within the association
    pub id: u8,
    /// the abstract syntax (SOP class) UID
    pub abstract_syntax: String,
    /// the transfer syntaxes offered for this context
    pub transfer_syntaxes: Vec<String>,
}

/// A presentation context as answered in an A-ASSOCIATE-AC.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PresentationContextResult {
    /// context identifier, matching the proposed context
    pub id: u8,
    /// the outcome for this context
    pub reason: PresentationContextResultReason,
    /// the single transfer syntax chosen by the acceptor
    pub transfer_syntax: String,
}

impl PresentationContextResult {
    /// Whether the context was accepted.
    pub fn is_accepted(&self) -> bool {
        self.reason == PresentationContextResultReason::Acceptance
    }
}

/// The outcome of presentation context negotiation (PS3.8 Table 9-18).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum PresentationContextResultReason {
    Acceptance = 0,
    UserRejection = 1,
    NoReason = 2,
    AbstractSyntaxNotSupported = 3,
    TransferSyntaxesNotSupported = 4,
}

impl PresentationContextResultReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        use PresentationContextResultReason::*;
        match value {
            0 => Some(Acceptance),
            1 => Some(UserRejection),
            2 => Some(NoReason),
            3 => Some(AbstractSyntaxNotSupported),
            4 => Some(TransferSyntaxesNotSupported),
            _ => None,
        }
    }
}

/// The rejection permanence of an A-ASSOCIATE-RJ.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AssociationRjResult {
    Permanent = 1,
    Transient = 2,
}

impl AssociationRjResult {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AssociationRjResult::Permanent),
            2 => Some(AssociationRjResult::Transient),
            _ => None,
        }
    }
}

/// The source and reason of an A-ASSOCIATE-RJ (PS3.8 Table 9-21).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AssociationRjSource {
    /// rejection by the UL service user
    ServiceUser(ServiceUserReason),
    /// rejection by the UL service provider (ACSE related)
    ServiceProviderAcse(ServiceProviderAcseReason),
    /// rejection by the UL service provider (presentation related)
    ServiceProviderPresentation(ServiceProviderPresentationReason),
}

impl AssociationRjSource {
    pub fn from_parts(source: u8, reason: u8) -> Option<Self> {
        match source {
            1 => ServiceUserReason::from_u8(reason).map(AssociationRjSource::ServiceUser),
            2 => ServiceProviderAcseReason::from_u8(reason)
                .map(AssociationRjSource::ServiceProviderAcse),
            3 => ServiceProviderPresentationReason::from_u8(reason)
                .map(AssociationRjSource::ServiceProviderPresentation),
            _ => None,
        }
    }

    pub fn to_parts(self) -> (u8, u8) {
        match self {
            AssociationRjSource::ServiceUser(r) => (1, r.as_u8()),
            AssociationRjSource::ServiceProviderAcse(r) => (2, r.as_u8()),
            AssociationRjSource::ServiceProviderPresentation(r) => (3, r.as_u8()),
        }
    }
}

/// Service-user rejection reasons.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ServiceUserReason {
    NoReasonGiven,
    ApplicationContextNameNotSupported,
    CallingAeTitleNotRecognized,
    CalledAeTitleNotRecognized,
    Reserved(u8),
}

impl ServiceUserReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        use ServiceUserReason::*;
        match value {
            1 => Some(NoReasonGiven),
            2 => Some(ApplicationContextNameNotSupported),
            3 => Some(CallingAeTitleNotRecognized),
            7 => Some(CalledAeTitleNotRecognized),
            4..=6 | 8..=10 => Some(Reserved(value)),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        use ServiceUserReason::*;
        match self {
            NoReasonGiven => 1,
            ApplicationContextNameNotSupported => 2,
            CallingAeTitleNotRecognized => 3,
            CalledAeTitleNotRecognized => 7,
            Reserved(v) => v,
        }
    }
}

/// Service-provider (ACSE) rejection reasons.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ServiceProviderAcseReason {
    NoReasonGiven,
    ProtocolVersionNotSupported,
}

impl ServiceProviderAcseReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ServiceProviderAcseReason::NoReasonGiven),
            2 => Some(ServiceProviderAcseReason::ProtocolVersionNotSupported),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            ServiceProviderAcseReason::NoReasonGiven => 1,
            ServiceProviderAcseReason::ProtocolVersionNotSupported => 2,
        }
    }
}

/// Service-provider (presentation) rejection reasons.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ServiceProviderPresentationReason {
    TemporaryCongestion,
    LocalLimitExceeded,
    Reserved(u8),
}

impl ServiceProviderPresentationReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        use ServiceProviderPresentationReason::*;
        match value {
            1 => Some(TemporaryCongestion),
            2 => Some(LocalLimitExceeded),
            0 | 3..=7 => Some(Reserved(value)),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        use ServiceProviderPresentationReason::*;
        match self {
            TemporaryCongestion => 1,
            LocalLimitExceeded => 2,
            Reserved(v) => v,
        }
    }
}

/// The source of an A-ABORT (PS3.8 Table 9-26).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AbortSource {
    ServiceUser,
    ServiceProvider(AbortServiceProviderReason),
}

impl AbortSource {
    pub fn from_parts(source: u8, reason: u8) -> Option<Self> {
        match source {
            0 => Some(AbortSource::ServiceUser),
            2 => AbortServiceProviderReason::from_u8(reason).map(AbortSource::ServiceProvider),
            _ => None,
        }
    }

    pub fn to_parts(self) -> (u8, u8) {
        match self {
            AbortSource::ServiceUser => (0, 0),
            AbortSource::ServiceProvider(r) => (2, r.as_u8()),
        }
    }
}

/// Service-provider abort reasons.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AbortServiceProviderReason {
    ReasonNotSpecified,
    UnrecognizedPdu,
    UnexpectedPdu,
    UnrecognizedPduParameter,
    UnexpectedPduParameter,
    InvalidPduParameter,
}

impl AbortServiceProviderReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        use AbortServiceProviderReason::*;
        match value {
            0 => Some(ReasonNotSpecified),
            1 => Some(UnrecognizedPdu),
            2 => Some(UnexpectedPdu),
            4 => Some(UnrecognizedPduParameter),
            5 => Some(UnexpectedPduParameter),
            6 => Some(InvalidPduParameter),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        use AbortServiceProviderReason::*;
        match self {
            ReasonNotSpecified => 0,
            UnrecognizedPdu => 1,
            UnexpectedPdu => 2,
            UnrecognizedPduParameter => 4,
            UnexpectedPduParameter => 5,
            InvalidPduParameter => 6,
        }
    }
}

/// One presentation data value within a P-DATA-TF PDU.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PDataValue {
    /// the presentation context this value belongs to
    pub presentation_context_id: u8,
    /// whether the payload is command or data set bytes
    pub value_type: PDataValueType,
    /// whether this is the last fragment of its half of the message
    pub is_last: bool,
    /// the payload bytes
    pub data: Vec<u8>,
}

/// Which half of a DIMSE message a PDV carries.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum PDataValueType {
    Command,
    Data,
}

/// A variable item encountered while parsing an association PDU.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum PduVariableItem {
    Unknown(u8),
    ApplicationContext(String),
    PresentationContextProposed(PresentationContextProposed),
    PresentationContextResult(PresentationContextResult),
    UserVariables(Vec<UserVariableItem>),
}

/// A user-information sub-item.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum UserVariableItem {
    /// `(51H)` maximum PDU length the sender is willing to receive;
    /// zero means unlimited
    MaxLength(u32),
    /// `(52H)` implementation class UID, for interoperability logs
    ImplementationClassUid(String),
    /// `(55H)` implementation version name, for interoperability logs
    ImplementationVersionName(String),
    /// any other sub-item, kept as raw bytes
    Unknown(u8, Vec<u8>),
}

/// A protocol data unit of the upper layer protocol.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Pdu {
    /// A-ASSOCIATE-RQ (type 01H)
    AssociationRq {
        protocol_version: u16,
        calling_ae_title: String,
        called_ae_title: String,
        application_context_name: String,
        presentation_contexts: Vec<PresentationContextProposed>,
        user_variables: Vec<UserVariableItem>,
    },
    /// A-ASSOCIATE-AC (type 02H)
    AssociationAc {
        protocol_version: u16,
        calling_ae_title: String,
        called_ae_title: String,
        application_context_name: String,
        presentation_contexts: Vec<PresentationContextResult>,
        user_variables: Vec<UserVariableItem>,
    },
    /// A-ASSOCIATE-RJ (type 03H)
    AssociationRj {
        result: AssociationRjResult,
        source: AssociationRjSource,
    },
    /// P-DATA-TF (type 04H)
    PData { data: Vec<PDataValue> },
    /// A-RELEASE-RQ (type 05H)
    ReleaseRq,
    /// A-RELEASE-RP (type 06H)
    ReleaseRp,
    /// A-ABORT (type 07H)
    AbortRq { source: AbortSource },
    /// any PDU with an unrecognized type code
    Unknown { pdu_type: u8, data: Vec<u8> },
}

impl Pdu {
    /// A short human readable description of the PDU kind,
    /// for trace logs.
    pub fn short_description(&self) -> &'static str {
        match self {
            Pdu::AssociationRq { .. } => "A-ASSOCIATE-RQ",
            Pdu::AssociationAc { .. } => "A-ASSOCIATE-AC",
            Pdu::AssociationRj { .. } => "A-ASSOCIATE-RJ",
            Pdu::PData { .. } => "P-DATA-TF",
            Pdu::ReleaseRq => "A-RELEASE-RQ",
            Pdu::ReleaseRp => "A-RELEASE-RP",
            Pdu::AbortRq { .. } => "A-ABORT",
            Pdu::Unknown { .. } => "(unknown)",
        }
    }
}
