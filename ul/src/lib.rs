//! This crate contains the types and methods needed to interact
//! with DICOM nodes through the upper layer protocol (PS3.8):
//!
//! - The [`pdu`] module provides the protocol data unit structures
//!   and their byte-exact readers and writers.
//! - The [`state`] module materializes the association state machine
//!   of PS3.8 Table 9-8, shared by both association halves.
//! - The [`association`] module comprises the abstractions for
//!   establishing and negotiating associations,
//!   as a requestor ([`ClientAssociation`])
//!   or as an acceptor ([`ServerAssociation`]).
//! - The [`address`] module provides the compound
//!   `AET@host:port` addressing of application entities.

pub mod address;
pub mod association;
pub mod pdu;
pub mod state;

/// The implementation class UID of this implementation,
/// generated under the UUID-derived arc per PS3.5 B.2.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.305828736383184136879919485884343304509";

/// The implementation version name of this implementation.
pub const IMPLEMENTATION_VERSION_NAME: &str = "PACS-RS 0.1.0";

// re-exports

pub use association::client::{ClientAssociation, ClientAssociationOptions};
pub use association::server::{AccessControl, ServerAssociation, ServerAssociationOptions};
pub use association::Association;
pub use pdu::reader::read_pdu;
pub use pdu::writer::write_pdu;
pub use pdu::Pdu;
