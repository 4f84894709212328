//! The retrieve handlers: C-MOVE (sub-association) and
//! C-GET (same-association) sub-operations.

use crate::context::ServerContext;
use crate::dispatch::{cancel_requested, CommandSnafu, ExchangeSnafu, Result};
use crate::scu::StorageScu;
use pacs_dimse::command::{CommandField, CommandSet, Priority, SubOperationCounts};
use pacs_dimse::message::{receive_message, Message};
use pacs_dimse::{send_message, MessageIdSequence, Status};
use pacs_dictionary_std::uids;
use pacs_index::query::matching_records;
use pacs_index::IndexRecord;
use pacs_metrics::DimseOperation;
use pacs_object::{FileObject, ReadOptions};
use pacs_ul::association::server::ServerAssociation;
use pacs_ul::Association;
use snafu::ResultExt;
use std::sync::Arc;
use std::time::Instant;

/// Running counters of one retrieve operation.
#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    completed: u16,
    failed: u16,
    warning: u16,
}

impl Counters {
    fn sub_operations(&self, remaining: usize) -> SubOperationCounts {
        SubOperationCounts {
            remaining: remaining as u16,
            completed: self.completed,
            failed: self.failed,
            warning: self.warning,
        }
    }

    fn terminal_status(&self) -> Status {
        if self.failed == 0 {
            Status::SUCCESS
        } else {
            // sub-operations complete, one or more failures
            Status(0xB000)
        }
    }
}

/// The presentation contexts a storage sub-association proposes:
/// one per distinct SOP class, offering the stored transfer
/// syntaxes plus the two base syntaxes.
fn contexts_for(records: &[Arc<IndexRecord>]) -> Vec<(String, Vec<String>)> {
    let mut contexts: Vec<(String, Vec<String>)> = Vec::new();
    for record in records {
        let position = contexts
            .iter()
            .position(|(sop_class, _)| sop_class == &record.sop_class_uid)
            .unwrap_or_else(|| {
                contexts.push((record.sop_class_uid.clone(), Vec::new()));
                contexts.len() - 1
            });
        let transfer_syntaxes = &mut contexts[position].1;
        for ts in [
            record.transfer_syntax.as_str(),
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
            uids::IMPLICIT_VR_LITTLE_ENDIAN,
        ] {
            if !transfer_syntaxes.iter().any(|t| t == ts) {
                transfer_syntaxes.push(ts.to_string());
            }
        }
    }
    contexts
}

fn load_stored(record: &IndexRecord) -> Option<FileObject> {
    match FileObject::open_file_with(
        &record.file_path,
        ReadOptions {
            allow_missing_preamble: true,
        },
    ) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::error!(
                sop_instance_uid = %record.sop_instance_uid,
                error = %e,
                "stored object is unreadable"
            );
            None
        }
    }
}

fn respond(
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    command: &CommandSet,
    field: CommandField,
    status: Status,
    counts: Option<SubOperationCounts>,
    comment: Option<&str>,
) -> Result<()> {
    let mut rsp =
        CommandSet::response(field, command, status, false).context(CommandSnafu)?;
    if let Some(counts) = counts {
        rsp = rsp.with_sub_operations(counts);
    }
    if let Some(comment) = comment {
        rsp = rsp.with_error_comment(comment);
    }
    send_message(association, presentation_context_id, &rsp, None).context(ExchangeSnafu)
}

pub(crate) fn handle_move(
    context: &ServerContext,
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    message: Message,
) -> Result<()> {
    let started = Instant::now();
    let command = message.command;
    let record_outcome = |success: bool| {
        context
            .metrics
            .record_operation(DimseOperation::CMove, success, started.elapsed());
    };

    let abstract_syntax = association
        .abstract_syntax_of(presentation_context_id)
        .unwrap_or_default();
    if abstract_syntax != uids::STUDY_ROOT_QR_MOVE
        && abstract_syntax != uids::PATIENT_ROOT_QR_MOVE
    {
        respond(
            association,
            presentation_context_id,
            &command,
            CommandField::CMoveRsp,
            Status::SOP_CLASS_NOT_SUPPORTED,
            None,
            None,
        )?;
        record_outcome(false);
        return Ok(());
    }

    let identifier = match &message.data {
        Some(identifier) => identifier,
        None => {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CMoveRsp,
                Status::CANNOT_UNDERSTAND,
                None,
                Some("C-MOVE-RQ without an identifier"),
            )?;
            record_outcome(false);
            return Ok(());
        }
    };

    let destination_ae = match command.move_destination() {
        Ok(destination) => destination,
        Err(_) => {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CMoveRsp,
                Status::CANNOT_UNDERSTAND,
                None,
                Some("C-MOVE-RQ without a move destination"),
            )?;
            record_outcome(false);
            return Ok(());
        }
    };

    // the destination AE title resolves through the configured directory
    let destination = match context.config.move_destination(&destination_ae) {
        Some(destination) => destination.clone(),
        None => {
            tracing::warn!(destination = %destination_ae, "unknown move destination");
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CMoveRsp,
                Status::MOVE_DESTINATION_UNKNOWN,
                None,
                None,
            )?;
            record_outcome(false);
            return Ok(());
        }
    };

    let records = match matching_records(&context.index, identifier) {
        Ok(records) => records,
        Err(e) => {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CMoveRsp,
                Status::CANNOT_UNDERSTAND,
                None,
                Some(&e.to_string()),
            )?;
            record_outcome(false);
            return Ok(());
        }
    };

    let mut scu = match StorageScu::connect(
        &context.config.ae_title,
        &destination,
        &contexts_for(&records),
        std::time::Duration::from_secs(context.config.connect_timeout_secs),
        context.config.dimse_timeout(),
    ) {
        Ok(scu) => scu,
        Err(e) => {
            tracing::error!(destination = %destination.ae_title, error = %e, "sub-association failed");
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CMoveRsp,
                Status::OUT_OF_RESOURCES,
                None,
                Some("could not open the storage sub-association"),
            )?;
            record_outcome(false);
            return Ok(());
        }
    };

    let mut counters = Counters::default();
    let total = records.len();
    for (sent, record) in records.iter().enumerate() {
        if cancel_requested(association)? {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CMoveRsp,
                Status::CANCEL,
                Some(counters.sub_operations(total - sent)),
                None,
            )?;
            let _ = scu.release();
            record_outcome(true);
            return Ok(());
        }

        match load_stored(record).map(|file| scu.store(&file)) {
            Some(Ok(status)) if status.is_success() => {
                counters.completed += 1;
                context.metrics.transfer.increment_images_retrieved();
                context
                    .metrics
                    .transfer
                    .add_bytes_sent(record.bytes_on_disk);
            }
            Some(Ok(status)) if status.is_warning() => counters.warning += 1,
            Some(Ok(_)) | None => counters.failed += 1,
            Some(Err(e)) => {
                tracing::warn!(
                    sop_instance_uid = %record.sop_instance_uid,
                    error = %e,
                    "storage sub-operation failed"
                );
                counters.failed += 1;
            }
        }

        let remaining = total - sent - 1;
        if remaining > 0 {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CMoveRsp,
                Status::PENDING,
                Some(counters.sub_operations(remaining)),
                None,
            )?;
        }
    }

    let _ = scu.release();
    let terminal = counters.terminal_status();
    respond(
        association,
        presentation_context_id,
        &command,
        CommandField::CMoveRsp,
        terminal,
        Some(counters.sub_operations(0)),
        None,
    )?;
    record_outcome(terminal.is_success());
    Ok(())
}

pub(crate) fn handle_get(
    context: &ServerContext,
    association: &mut ServerAssociation,
    presentation_context_id: u8,
    message: Message,
    message_ids: &mut MessageIdSequence,
) -> Result<()> {
    let started = Instant::now();
    let command = message.command;
    let record_outcome = |success: bool| {
        context
            .metrics
            .record_operation(DimseOperation::CGet, success, started.elapsed());
    };

    let abstract_syntax = association
        .abstract_syntax_of(presentation_context_id)
        .unwrap_or_default();
    if abstract_syntax != uids::STUDY_ROOT_QR_GET && abstract_syntax != uids::PATIENT_ROOT_QR_GET
    {
        respond(
            association,
            presentation_context_id,
            &command,
            CommandField::CGetRsp,
            Status::SOP_CLASS_NOT_SUPPORTED,
            None,
            None,
        )?;
        record_outcome(false);
        return Ok(());
    }

    let identifier = match &message.data {
        Some(identifier) => identifier,
        None => {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CGetRsp,
                Status::CANNOT_UNDERSTAND,
                None,
                Some("C-GET-RQ without an identifier"),
            )?;
            record_outcome(false);
            return Ok(());
        }
    };

    let records = match matching_records(&context.index, identifier) {
        Ok(records) => records,
        Err(e) => {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CGetRsp,
                Status::CANNOT_UNDERSTAND,
                None,
                Some(&e.to_string()),
            )?;
            record_outcome(false);
            return Ok(());
        }
    };

    let mut counters = Counters::default();
    let total = records.len();
    for (sent, record) in records.iter().enumerate() {
        // the sub-store travels on this same association,
        // on the context negotiated for the record's SOP class
        let store_context = association
            .presentation_contexts()
            .iter()
            .filter(|pc| pc.is_accepted())
            .find(|pc| {
                association.abstract_syntax_of(pc.id) == Some(record.sop_class_uid.as_str())
            })
            .map(|pc| (pc.id, pc.transfer_syntax.clone()));

        let stored = match (store_context, load_stored(record)) {
            (Some((store_pc, negotiated_ts)), Some(file)) => {
                if file
                    .dataset()
                    .get(pacs_dictionary_std::tags::PIXEL_DATA)
                    .map(|e| matches!(e.value(), pacs_core::Value::PixelSequence { .. }))
                    .unwrap_or(false)
                    && pacs_transfer_syntax_registry::trim_uid(&file.meta().transfer_syntax)
                        != pacs_transfer_syntax_registry::trim_uid(&negotiated_ts)
                {
                    tracing::warn!(
                        sop_instance_uid = %record.sop_instance_uid,
                        "cannot transcode encapsulated object for C-GET"
                    );
                    None
                } else {
                    let store_command = CommandSet::c_store_rq(
                        message_ids.next_id(),
                        &record.sop_class_uid,
                        &record.sop_instance_uid,
                        Priority::Medium,
                    );
                    send_message(association, store_pc, &store_command, Some(file.dataset()))
                        .context(ExchangeSnafu)?;
                    let (_, response) =
                        receive_message(association).context(ExchangeSnafu)?;
                    response.command.status().ok()
                }
            }
            _ => None,
        };

        match stored {
            Some(status) if status.is_success() => {
                counters.completed += 1;
                context.metrics.transfer.increment_images_retrieved();
                context
                    .metrics
                    .transfer
                    .add_bytes_sent(record.bytes_on_disk);
            }
            Some(status) if status.is_warning() => counters.warning += 1,
            _ => counters.failed += 1,
        }

        let remaining = total - sent - 1;
        if remaining > 0 {
            respond(
                association,
                presentation_context_id,
                &command,
                CommandField::CGetRsp,
                Status::PENDING,
                Some(counters.sub_operations(remaining)),
                None,
            )?;
        }
    }

    let terminal = counters.terminal_status();
    respond(
        association,
        presentation_context_id,
        &command,
        CommandField::CGetRsp,
        terminal,
        Some(counters.sub_operations(0)),
        None,
    )?;
    record_outcome(terminal.is_success());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::contexts_for;
    use pacs_index::IndexRecord;
    use std::sync::Arc;

    fn record(sop_class: &str, ts: &str) -> Arc<IndexRecord> {
        Arc::new(IndexRecord {
            sop_instance_uid: "1.2.3.4.5".to_string(),
            sop_class_uid: sop_class.to_string(),
            series_instance_uid: "1.2.3.1".to_string(),
            study_instance_uid: "1.2.3".to_string(),
            patient_id: "123".to_string(),
            patient_name: "DOE^JOHN".to_string(),
            modality: "CT".to_string(),
            study_date: None,
            series_number: None,
            instance_number: None,
            slice_location: None,
            image_position_patient: None,
            acquisition_time: None,
            transfer_syntax: ts.to_string(),
            file_path: std::path::PathBuf::from("/data/x.dcm"),
            bytes_on_disk: 10,
            received_at: chrono::Utc::now(),
        })
    }

    #[test]
    fn contexts_group_by_sop_class() {
        let records = vec![
            record("1.2.840.10008.5.1.4.1.1.2", "1.2.840.10008.1.2.1"),
            record("1.2.840.10008.5.1.4.1.1.2", "1.2.840.10008.1.2"),
            record("1.2.840.10008.5.1.4.1.1.4", "1.2.840.10008.1.2.1"),
        ];
        let contexts = contexts_for(&records);
        assert_eq!(contexts.len(), 2);
        let ct = contexts
            .iter()
            .find(|(sop, _)| sop == "1.2.840.10008.5.1.4.1.1.2")
            .unwrap();
        assert!(ct.1.contains(&"1.2.840.10008.1.2.1".to_string()));
        assert!(ct.1.contains(&"1.2.840.10008.1.2".to_string()));
    }
}
