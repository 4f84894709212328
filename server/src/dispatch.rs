//! Routing of received DIMSE requests to service handlers,
//! keyed by the context's abstract syntax and the command field.

use crate::context::ServerContext;
use crate::find;
use crate::ingest;
use crate::mpps;
use crate::retrieve;
use pacs_dimse::command::{CommandField, CommandSet};
use pacs_dimse::message::Message;
use pacs_dimse::{send_message, MessageIdSequence, Status};
use pacs_dictionary_std::uids;
use pacs_metrics::DimseOperation;
use pacs_ul::association::server::ServerAssociation;
use snafu::{Backtrace, ResultExt, Snafu};
use std::time::Instant;

/// A fatal service failure: the association cannot continue.
/// Per-message errors are answered with DIMSE failure statuses
/// instead and do not produce this type.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub))]
pub enum ServiceError {
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
    #[snafu(display("association failure"))]
    Association {
        #[snafu(backtrace)]
        source: pacs_ul::association::Error,
    },
    #[snafu(display("the peer aborted during an operation"))]
    PeerAborted { backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Route one received message to its handler.
pub fn dispatch(
    context: &ServerContext,
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    message: Message,
    message_ids: &mut MessageIdSequence,
) -> Result<()> {
    let field = message.command.command_field().context(CommandSnafu)?;
    match field {
        CommandField::CEchoRq => handle_echo(context, association, presentation_context_id, message),
        CommandField::CStoreRq => {
            handle_store(context, association, presentation_context_id, message)
        }
        CommandField::CFindRq => {
            find::handle_find(context, association, presentation_context_id, message)
        }
        CommandField::CMoveRq => retrieve::handle_move(
            context,
            association,
            presentation_context_id,
            message,
        ),
        CommandField::CGetRq => retrieve::handle_get(
            context,
            association,
            presentation_context_id,
            message,
            message_ids,
        ),
        CommandField::NCreateRq | CommandField::NSetRq => {
            handle_mpps(context, association, presentation_context_id, message, field)
        }
        CommandField::CCancelRq => {
            // a cancel with no operation in flight has nothing to stop
            tracing::debug!("stray C-CANCEL-RQ ignored");
            Ok(())
        }
        other => {
            tracing::warn!(?other, "unsupported command field");
            let rsp = CommandSet::response(
                response_field_for(other),
                &message.command,
                Status(0x0211),
                false,
            )
            .context(CommandSnafu)?;
            send_message(association, presentation_context_id, &rsp, None)
                .context(ExchangeSnafu)?;
            Ok(())
        }
    }
}

/// The response command field paired with a request field.
fn response_field_for(field: CommandField) -> CommandField {
    use CommandField::*;
    match field {
        CStoreRq => CStoreRsp,
        CGetRq => CGetRsp,
        CFindRq => CFindRsp,
        CMoveRq => CMoveRsp,
        CEchoRq => CEchoRsp,
        NEventReportRq => NEventReportRsp,
        NGetRq => NGetRsp,
        NSetRq => NSetRsp,
        NActionRq => NActionRsp,
        NCreateRq => NCreateRsp,
        NDeleteRq => NDeleteRsp,
        other => other,
    }
}

fn handle_echo(
    context: &ServerContext,
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    message: Message,
) -> Result<()> {
    let started = Instant::now();
    let status = if association.abstract_syntax_of(presentation_context_id)
        == Some(uids::VERIFICATION)
    {
        Status::SUCCESS
    } else {
        Status::SOP_CLASS_NOT_SUPPORTED
    };
    let rsp = CommandSet::response(CommandField::CEchoRsp, &message.command, status, false)
        .context(CommandSnafu)?;
    send_message(association, presentation_context_id, &rsp, None).context(ExchangeSnafu)?;
    context
        .metrics
        .record_operation(DimseOperation::CEcho, status.is_success(), started.elapsed());
    Ok(())
}

fn handle_store(
    context: &ServerContext,
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    message: Message,
) -> Result<()> {
    let started = Instant::now();
    let command = message.command;

    let abstract_syntax = association
        .abstract_syntax_of(presentation_context_id)
        .unwrap_or_default()
        .to_string();
    let affected = command.affected_sop_class_uid().unwrap_or_default();

    let (status, comment) = if affected != abstract_syntax {
        // a handler only serves requests on a context whose
        // abstract syntax matches the requested SOP class
        (
            Status::SOP_CLASS_NOT_SUPPORTED,
            Some("SOP class does not match the presentation context".to_string()),
        )
    } else if !uids::is_storage_sop_class(&abstract_syntax) {
        (Status::SOP_CLASS_NOT_SUPPORTED, None)
    } else {
        match message.data {
            None => (
                Status::CANNOT_UNDERSTAND,
                Some("C-STORE-RQ without a data set".to_string()),
            ),
            Some(dataset) => {
                let transfer_syntax = association
                    .transfer_syntax_of(presentation_context_id)
                    .unwrap_or(uids::IMPLICIT_VR_LITTLE_ENDIAN)
                    .to_string();
                let calling = association.client_ae_title().to_string();
                let outcome = ingest::ingest(context, dataset, &transfer_syntax, &calling);
                (outcome.status, outcome.message)
            }
        }
    };

    let mut rsp = CommandSet::response(CommandField::CStoreRsp, &command, status, false)
        .context(CommandSnafu)?;
    if let Some(comment) = comment {
        rsp = rsp.with_error_comment(&comment);
    }
    send_message(association, presentation_context_id, &rsp, None).context(ExchangeSnafu)?;
    context.metrics.record_operation(
        DimseOperation::CStore,
        status.is_success(),
        started.elapsed(),
    );
    Ok(())
}

fn handle_mpps(
    context: &ServerContext,
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    message: Message,
    field: CommandField,
) -> Result<()> {
    let started = Instant::now();
    let command = message.command;
    let response_field = response_field_for(field);
    let operation = if field == CommandField::NCreateRq {
        DimseOperation::NCreate
    } else {
        DimseOperation::NSet
    };

    let abstract_syntax = association
        .abstract_syntax_of(presentation_context_id)
        .unwrap_or_default();
    if abstract_syntax != uids::MODALITY_PERFORMED_PROCEDURE_STEP {
        let rsp = CommandSet::response(
            response_field,
            &command,
            Status::SOP_CLASS_NOT_SUPPORTED,
            false,
        )
        .context(CommandSnafu)?;
        send_message(association, presentation_context_id, &rsp, None)
            .context(ExchangeSnafu)?;
        context
            .metrics
            .record_operation(operation, false, started.elapsed());
        return Ok(());
    }

    let sop_instance_uid = if field == CommandField::NCreateRq {
        command.affected_sop_instance_uid()
    } else {
        command.requested_sop_instance_uid()
    };

    let (status, comment) = match (sop_instance_uid, message.data) {
        (Some(uid), Some(dataset)) => {
            let outcome = if field == CommandField::NCreateRq {
                context.mpps.create(&uid, dataset)
            } else {
                context.mpps.update(&uid, dataset)
            };
            match outcome {
                Ok(()) => (Status::SUCCESS, None),
                Err(mpps::Error::AlreadyExists { .. }) => {
                    (Status::DUPLICATE_SOP_INSTANCE, None)
                }
                Err(mpps::Error::NoSuchStep { .. }) => (Status::NO_SUCH_OBJECT_INSTANCE, None),
                Err(e @ mpps::Error::StepClosed { .. }) => {
                    (Status::PROCESSING_FAILURE, Some(e.to_string()))
                }
            }
        }
        _ => (
            Status::CANNOT_UNDERSTAND,
            Some("MPPS request without instance UID or data set".to_string()),
        ),
    };

    let mut rsp = CommandSet::response(response_field, &command, status, false)
        .context(CommandSnafu)?;
    if let Some(comment) = comment {
        rsp = rsp.with_error_comment(&comment);
    }
    send_message(association, presentation_context_id, &rsp, None).context(ExchangeSnafu)?;
    context
        .metrics
        .record_operation(operation, status.is_success(), started.elapsed());
    Ok(())
}

/// Poll for a C-CANCEL-RQ between response emissions.
///
/// Returns `Ok(true)` when a cancel arrived,
/// `Ok(false)` when nothing (or something ignorable) arrived.
pub(crate) fn cancel_requested(association: &mut ServerAssociation) -> Result<bool> {
    use pacs_ul::pdu::{PDataValueType, Pdu};
    let pdu = match association
        .receive_timeout(std::time::Duration::from_millis(1))
        .context(AssociationSnafu)?
    {
        None => return Ok(false),
        Some(pdu) => pdu,
    };
    match pdu {
        Pdu::PData { data } => {
            let command_bytes: Vec<u8> = data
                .iter()
                .filter(|pdv| pdv.value_type == PDataValueType::Command)
                .flat_map(|pdv| pdv.data.iter().copied())
                .collect();
            if command_bytes.is_empty() {
                return Ok(false);
            }
            match CommandSet::decode(&command_bytes) {
                Ok(command) => Ok(command.command_field().ok() == Some(CommandField::CCancelRq)),
                Err(_) => Ok(false),
            }
        }
        Pdu::AbortRq { .. } => PeerAbortedSnafu.fail(),
        _ => Ok(false),
    }
}
