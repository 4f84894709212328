//! Outgoing storage operations:
//! the storage SCU used for C-MOVE sub-operations
//! and for pushing objects to any remote node.

use crate::config::{MoveDestination, ScuConfig};
use pacs_dimse::command::{CommandSet, Priority};
use pacs_dimse::{receive_message, send_message, MessageIdSequence, Status};
use pacs_object::FileObject;
use pacs_transfer_syntax_registry::trim_uid;
use pacs_ul::association::client::{ClientAssociation, ClientAssociationOptions};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::time::Duration;

/// A storage SCU failure.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not establish the storage association"))]
    Establish {
        #[snafu(backtrace)]
        source: pacs_ul::association::Error,
    },
    #[snafu(display("message exchange failed"))]
    Exchange {
        #[snafu(backtrace)]
        source: pacs_dimse::message::Error,
    },
    #[snafu(display("command set failure"))]
    Command {
        #[snafu(backtrace)]
        source: pacs_dimse::command::Error,
    },
    #[snafu(display("no accepted presentation context for {}", sop_class_uid))]
    NoPresentationContext {
        sop_class_uid: String,
        backtrace: Backtrace,
    },
    /// The object is encapsulated and the acceptor chose a
    /// different transfer syntax; transcoding is a codec concern
    /// outside this suite.
    #[snafu(display(
        "object in {} cannot be sent as {} without transcoding",
        stored,
        negotiated
    ))]
    TranscodeRequired {
        stored: String,
        negotiated: String,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A client association dedicated to C-STORE sub-operations.
pub struct StorageScu {
    association: ClientAssociation,
    message_ids: MessageIdSequence,
}

impl StorageScu {
    /// Open a storage association towards the given destination,
    /// proposing one context per abstract syntax in `contexts`.
    pub fn connect(
        calling_ae_title: &str,
        destination: &MoveDestination,
        contexts: &[(String, Vec<String>)],
        connect_timeout: Duration,
        dimse_timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientAssociationOptions::new()
            .calling_ae_title(calling_ae_title.to_string())
            .called_ae_title(destination.ae_title.clone())
            .connect_timeout(connect_timeout)
            .read_timeout(dimse_timeout);
        for (abstract_syntax, transfer_syntaxes) in contexts {
            options = options
                .with_presentation_context(abstract_syntax.clone(), transfer_syntaxes.clone());
        }
        let association = options
            .establish(destination.socket_addr())
            .context(EstablishSnafu)?;
        Ok(StorageScu {
            association,
            message_ids: MessageIdSequence::new(),
        })
    }

    /// Open a storage association described by an SCU configuration.
    pub fn from_config(config: &ScuConfig) -> Result<Self> {
        let mut options = ClientAssociationOptions::new()
            .calling_ae_title(config.calling_ae.clone())
            .called_ae_title(config.called_ae.clone())
            .max_pdu_length(config.max_pdu_size)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.dimse_timeout());
        for (abstract_syntax, transfer_syntaxes) in &config.proposed_contexts {
            options = options
                .with_presentation_context(abstract_syntax.clone(), transfer_syntaxes.clone());
        }
        let association = options
            .establish(config.socket_addr())
            .context(EstablishSnafu)?;
        Ok(StorageScu {
            association,
            message_ids: MessageIdSequence::new(),
        })
    }

    /// Store one object on the peer, returning the peer's status.
    pub fn store(&mut self, file: &FileObject) -> Result<Status> {
        let sop_class_uid = trim_uid(&file.meta().media_storage_sop_class_uid).to_string();
        let sop_instance_uid = trim_uid(&file.meta().media_storage_sop_instance_uid).to_string();
        let stored_ts = trim_uid(&file.meta().transfer_syntax).to_string();

        let pc = self
            .association
            .presentation_context_for(&sop_class_uid)
            .context(NoPresentationContextSnafu {
                sop_class_uid: sop_class_uid.clone(),
            })?
            .clone();

        // encapsulated pixel data cannot be re-encoded here
        let has_pixel_fragments = file
            .dataset()
            .get(pacs_dictionary_std::tags::PIXEL_DATA)
            .map(|e| matches!(e.value(), pacs_core::Value::PixelSequence { .. }))
            .unwrap_or(false);
        if has_pixel_fragments && trim_uid(&pc.transfer_syntax) != stored_ts {
            return TranscodeRequiredSnafu {
                stored: stored_ts,
                negotiated: trim_uid(&pc.transfer_syntax).to_string(),
            }
            .fail();
        }

        let command = CommandSet::c_store_rq(
            self.message_ids.next_id(),
            &sop_class_uid,
            &sop_instance_uid,
            Priority::Medium,
        );
        send_message(&mut self.association, pc.id, &command, Some(file.dataset()))
            .context(ExchangeSnafu)?;

        let (_, response) = receive_message(&mut self.association).context(ExchangeSnafu)?;
        response.command.status().context(CommandSnafu)
    }

    /// Release the association gracefully.
    pub fn release(self) -> Result<()> {
        self.association.release().context(EstablishSnafu)
    }
}
