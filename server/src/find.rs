//! The C-FIND handler: query/retrieve and modality worklist.

use crate::context::ServerContext;
use crate::dispatch::{cancel_requested, CommandSnafu, ExchangeSnafu, Result};
use pacs_dimse::command::{CommandField, CommandSet};
use pacs_dimse::message::Message;
use pacs_dimse::{send_message, Status};
use pacs_dictionary_std::uids;
use pacs_index::query;
use pacs_index::worklist::is_worklist_identifier;
use pacs_metrics::DimseOperation;
use pacs_object::InMemObject;
use pacs_ul::association::server::ServerAssociation;
use snafu::ResultExt;
use std::time::Instant;

pub(crate) fn handle_find(
    context: &ServerContext,
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    message: Message,
) -> Result<()> {
    let started = Instant::now();
    let command = message.command;

    let identifier = match message.data {
        Some(identifier) => identifier,
        None => {
            let rsp = CommandSet::response(
                CommandField::CFindRsp,
                &command,
                Status::CANNOT_UNDERSTAND,
                false,
            )
            .context(CommandSnafu)?
            .with_error_comment("C-FIND-RQ without a query identifier");
            send_message(association, presentation_context_id, &rsp, None)
                .context(ExchangeSnafu)?;
            context
                .metrics
                .record_operation(DimseOperation::CFind, false, started.elapsed());
            return Ok(());
        }
    };

    let abstract_syntax = association
        .abstract_syntax_of(presentation_context_id)
        .unwrap_or_default()
        .to_string();

    let matches: Vec<InMemObject> = if abstract_syntax == uids::MODALITY_WORKLIST_FIND
        || (abstract_syntax.is_empty() && is_worklist_identifier(&identifier))
    {
        context.worklist.query(&identifier)
    } else if abstract_syntax == uids::STUDY_ROOT_QR_FIND
        || abstract_syntax == uids::PATIENT_ROOT_QR_FIND
    {
        match query::find(&context.index, &identifier) {
            Ok(matches) => matches,
            Err(e) => {
                let rsp = CommandSet::response(
                    CommandField::CFindRsp,
                    &command,
                    Status::CANNOT_UNDERSTAND,
                    false,
                )
                .context(CommandSnafu)?
                .with_error_comment(&e.to_string());
                send_message(association, presentation_context_id, &rsp, None)
                    .context(ExchangeSnafu)?;
                context
                    .metrics
                    .record_operation(DimseOperation::CFind, false, started.elapsed());
                return Ok(());
            }
        }
    } else {
        let rsp = CommandSet::response(
            CommandField::CFindRsp,
            &command,
            Status::SOP_CLASS_NOT_SUPPORTED,
            false,
        )
        .context(CommandSnafu)?;
        send_message(association, presentation_context_id, &rsp, None)
            .context(ExchangeSnafu)?;
        context
            .metrics
            .record_operation(DimseOperation::CFind, false, started.elapsed());
        return Ok(());
    };

    tracing::debug!(
        matches = matches.len(),
        abstract_syntax = %abstract_syntax,
        "answering C-FIND"
    );

    for matched in &matches {
        // the requester may cancel between match emissions
        if cancel_requested(association)? {
            let rsp = CommandSet::response(
                CommandField::CFindRsp,
                &command,
                Status::CANCEL,
                false,
            )
            .context(CommandSnafu)?;
            send_message(association, presentation_context_id, &rsp, None)
                .context(ExchangeSnafu)?;
            context
                .metrics
                .record_operation(DimseOperation::CFind, true, started.elapsed());
            return Ok(());
        }

        let pending =
            CommandSet::response(CommandField::CFindRsp, &command, Status::PENDING, true)
                .context(CommandSnafu)?;
        send_message(association, presentation_context_id, &pending, Some(matched))
            .context(ExchangeSnafu)?;
    }

    let done = CommandSet::response(CommandField::CFindRsp, &command, Status::SUCCESS, false)
        .context(CommandSnafu)?;
    send_message(association, presentation_context_id, &done, None).context(ExchangeSnafu)?;
    context
        .metrics
        .record_operation(DimseOperation::CFind, true, started.elapsed());
    Ok(())
}
