//! The service class provider of the PACS suite.
//!
//! [`PacsServer`] accepts associations on a listening socket,
//! negotiates them through `pacs-ul`, and dispatches the DIMSE
//! requests of each association to the built-in handlers:
//! verification, storage (with the ingestion pipeline),
//! study/patient-root query, modality worklist, retrieve
//! (C-MOVE over a sub-association, C-GET in-band) and MPPS.
//!
//! The storage ingestion path emits typed [`StorageEvent`]s on a
//! channel handed out at construction, so consumers observe stores
//! without callbacks and shutdown stays deterministic.
//! Backpressure is inherited from the blocking transport:
//! a slow reader stalls the handler on the write half
//! rather than growing buffers.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod ingest;
pub mod mpps;
pub mod scu;
pub mod server;
pub mod validation;

mod find;
mod retrieve;

pub use crate::config::{DuplicatePolicy, MoveDestination, ScpConfig, ScuConfig, ValidationGate};
pub use crate::context::ServerContext;
pub use crate::ingest::StorageEvent;
pub use crate::scu::StorageScu;
pub use crate::server::PacsServer;
