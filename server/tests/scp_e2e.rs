//! End-to-end service scenarios over a loopback socket.

use pacs_core::{PrimitiveValue, VR};
use pacs_dimse::command::{CommandSet, Priority};
use pacs_dimse::{receive_message, send_message, Status};
use pacs_dictionary_std::{tags, uids};
use pacs_object::{DataElement, InMemObject};
use pacs_server::{PacsServer, ScpConfig, StorageEvent};
use pacs_ul::{Association, ClientAssociationOptions};
use std::thread;

fn test_config(root: &std::path::Path) -> ScpConfig {
    let mut config = ScpConfig::default();
    config.ae_title = "MAIN-PACS".to_string();
    config.bind_host = "127.0.0.1".to_string();
    config.port = 0;
    config.storage_root = root.to_path_buf();
    config
}

fn minimal_ct() -> InMemObject {
    let mut obj = InMemObject::new_empty();
    obj.put_str(tags::SOP_CLASS_UID, VR::UI, uids::CT_IMAGE_STORAGE);
    obj.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
    obj.put_str(tags::STUDY_INSTANCE_UID, VR::UI, "1.2.3");
    obj.put_str(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.1");
    obj.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
    obj.put_str(tags::PATIENT_ID, VR::LO, "123");
    obj.put_str(tags::MODALITY, VR::CS, "CT");
    obj.put_str(tags::STUDY_DATE, VR::DA, "20240115");
    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)));
    obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(2_u16)));
    obj.put(DataElement::new(
        tags::BITS_ALLOCATED,
        VR::US,
        PrimitiveValue::from(8_u16),
    ));
    obj.put(DataElement::new(
        tags::BITS_STORED,
        VR::US,
        PrimitiveValue::from(8_u16),
    ));
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(vec![0u8, 128, 64, 255]),
    ));
    obj
}

#[test]
fn c_echo_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (server, _events) = PacsServer::bind(test_config(dir.path())).unwrap();
    let addr = server.local_addr().unwrap();
    let context = server.context();
    let worker = thread::spawn(move || server.handle_next().unwrap());

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("ECHO-SCU")
        .called_ae_title("MAIN-PACS")
        .with_presentation_context(uids::VERIFICATION, vec![uids::EXPLICIT_VR_LITTLE_ENDIAN])
        .establish(addr)
        .unwrap();

    let pc_id = association.presentation_contexts()[0].id;
    let rq = CommandSet::c_echo_rq(1);
    send_message(&mut association, pc_id, &rq, None).unwrap();

    let (_, response) = receive_message(&mut association).unwrap();
    assert_eq!(response.command.message_id_being_responded_to().unwrap(), 1);
    assert_eq!(response.command.status().unwrap(), Status::SUCCESS);
    assert!(response.data.is_none());

    association.release().unwrap();
    worker.join().unwrap();

    let echo = context
        .metrics
        .operation(pacs_metrics::DimseOperation::CEcho);
    assert_eq!(echo.success_count(), 1);
    assert_eq!(context.metrics.associations.total_established(), 1);
}

#[test]
fn c_store_minimal_ct() {
    let dir = tempfile::tempdir().unwrap();
    let (server, events) = PacsServer::bind(test_config(dir.path())).unwrap();
    let addr = server.local_addr().unwrap();
    let context = server.context();
    let worker = thread::spawn(move || server.handle_next().unwrap());

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("STORE-SCU")
        .called_ae_title("MAIN-PACS")
        .with_presentation_context(
            uids::CT_IMAGE_STORAGE,
            vec![uids::EXPLICIT_VR_LITTLE_ENDIAN],
        )
        .establish(addr)
        .unwrap();

    let pc_id = association.presentation_contexts()[0].id;
    let rq = CommandSet::c_store_rq(1, uids::CT_IMAGE_STORAGE, "1.2.3.4.5", Priority::Medium);
    send_message(&mut association, pc_id, &rq, Some(&minimal_ct())).unwrap();

    let (_, response) = receive_message(&mut association).unwrap();
    assert_eq!(response.command.status().unwrap(), Status::SUCCESS);
    association.release().unwrap();
    worker.join().unwrap();

    // organized layout: <root>/<patient>/<study>/<series>/<sop>.dcm
    let stored = dir
        .path()
        .join("123")
        .join("1.2.3")
        .join("1.2.3.1")
        .join("1_2_3_4_5.dcm");
    assert!(stored.exists(), "missing {}", stored.display());

    let record = context.index.get("1.2.3.4.5").expect("record indexed");
    assert_eq!(record.study_instance_uid, "1.2.3");
    assert_eq!(record.modality, "CT");

    match events.try_recv().unwrap() {
        StorageEvent::InstanceStored {
            sop_instance_uid,
            calling_ae_title,
            ..
        } => {
            assert_eq!(sop_instance_uid, "1.2.3.4.5");
            assert_eq!(calling_ae_title, "STORE-SCU");
        }
        other => panic!("unexpected event {:?}", other),
    }

    assert_eq!(context.metrics.transfer.images_stored(), 1);
    assert!(context.metrics.transfer.bytes_received() > 0);
}

#[test]
fn c_find_study_level_match() {
    let dir = tempfile::tempdir().unwrap();
    let (server, _events) = PacsServer::bind(test_config(dir.path())).unwrap();
    let addr = server.local_addr().unwrap();
    let context = server.context();

    // two studies in the catalog
    for (sop, series, study, patient, date) in [
        ("1.2.3.4.5", "1.2.3.1", "1.2.3", "123", "20240115"),
        ("1.2.9.4.5", "1.2.9.1", "1.2.9", "456", "20240301"),
    ] {
        context
            .index
            .upsert(pacs_index::IndexRecord {
                sop_instance_uid: sop.to_string(),
                sop_class_uid: uids::CT_IMAGE_STORAGE.to_string(),
                series_instance_uid: series.to_string(),
                study_instance_uid: study.to_string(),
                patient_id: patient.to_string(),
                patient_name: "DOE^JOHN".to_string(),
                modality: "CT".to_string(),
                study_date: Some(date.to_string()),
                series_number: Some(1),
                instance_number: Some(1),
                slice_location: None,
                image_position_patient: None,
                acquisition_time: None,
                transfer_syntax: uids::EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
                file_path: dir.path().join("x.dcm"),
                bytes_on_disk: 128,
                received_at: chrono::Utc::now(),
            })
            .unwrap();
    }

    let worker = thread::spawn(move || server.handle_next().unwrap());

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("FIND-SCU")
        .called_ae_title("MAIN-PACS")
        .with_presentation_context(
            uids::STUDY_ROOT_QR_FIND,
            vec![uids::EXPLICIT_VR_LITTLE_ENDIAN],
        )
        .establish(addr)
        .unwrap();

    let pc_id = association.presentation_contexts()[0].id;
    let rq = CommandSet::c_find_rq(7, uids::STUDY_ROOT_QR_FIND, Priority::Medium);
    let mut identifier = InMemObject::new_empty();
    identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "STUDY");
    identifier.put_str(tags::PATIENT_ID, VR::LO, "123");
    identifier.put(DataElement::empty(tags::STUDY_INSTANCE_UID, VR::UI));
    identifier.put(DataElement::empty(tags::STUDY_DATE, VR::DA));
    send_message(&mut association, pc_id, &rq, Some(&identifier)).unwrap();

    // one pending response with the match
    let (_, pending) = receive_message(&mut association).unwrap();
    assert!(pending.command.status().unwrap().is_pending());
    let matched = pending.data.expect("pending response carries data");
    assert_eq!(matched.string(tags::STUDY_INSTANCE_UID).unwrap(), "1.2.3");
    assert_eq!(matched.string(tags::STUDY_DATE).unwrap(), "20240115");

    // then the terminal success
    let (_, done) = receive_message(&mut association).unwrap();
    assert_eq!(done.command.status().unwrap(), Status::SUCCESS);
    assert_eq!(done.command.message_id_being_responded_to().unwrap(), 7);

    association.release().unwrap();
    worker.join().unwrap();
}

#[test]
fn association_rejected_for_unknown_calling_ae() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.allowed_peer_ae_titles = vec!["GOOD_SCU".to_string()];
    let (server, _events) = PacsServer::bind(config).unwrap();
    let addr = server.local_addr().unwrap();
    let context = server.context();
    let worker = thread::spawn(move || server.handle_next().unwrap());

    let err = ClientAssociationOptions::new()
        .calling_ae_title("BAD_SCU")
        .called_ae_title("MAIN-PACS")
        .with_presentation_context(uids::VERIFICATION, vec![uids::EXPLICIT_VR_LITTLE_ENDIAN])
        .establish(addr)
        .unwrap_err();

    match err {
        pacs_ul::association::Error::Rejected {
            result,
            reject_source,
            ..
        } => {
            use pacs_ul::pdu::{AssociationRjResult, AssociationRjSource, ServiceUserReason};
            assert_eq!(result, AssociationRjResult::Permanent);
            assert_eq!(
                reject_source,
                AssociationRjSource::ServiceUser(ServiceUserReason::CallingAeTitleNotRecognized)
            );
        }
        other => panic!("unexpected {:?}", other),
    }

    worker.join().unwrap();
    assert_eq!(context.metrics.associations.total_rejected(), 1);
    assert_eq!(context.metrics.associations.current_active(), 0);
}

#[test]
fn mpps_create_and_set() {
    let dir = tempfile::tempdir().unwrap();
    let (server, _events) = PacsServer::bind(test_config(dir.path())).unwrap();
    let addr = server.local_addr().unwrap();
    let context = server.context();
    let worker = thread::spawn(move || server.handle_next().unwrap());

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("MODALITY")
        .called_ae_title("MAIN-PACS")
        .with_presentation_context(
            uids::MODALITY_PERFORMED_PROCEDURE_STEP,
            vec![uids::EXPLICIT_VR_LITTLE_ENDIAN],
        )
        .establish(addr)
        .unwrap();
    let pc_id = association.presentation_contexts()[0].id;

    let mut step = InMemObject::new_empty();
    step.put_str(tags::PERFORMED_PROCEDURE_STEP_STATUS, VR::CS, "IN PROGRESS");
    step.put_str(tags::PERFORMED_PROCEDURE_STEP_ID, VR::SH, "PPS1");
    let create = CommandSet::n_create_rq(1, uids::MODALITY_PERFORMED_PROCEDURE_STEP, "1.9.9.1");
    send_message(&mut association, pc_id, &create, Some(&step)).unwrap();
    let (_, response) = receive_message(&mut association).unwrap();
    assert_eq!(response.command.status().unwrap(), Status::SUCCESS);

    let mut completion = InMemObject::new_empty();
    completion.put_str(tags::PERFORMED_PROCEDURE_STEP_STATUS, VR::CS, "COMPLETED");
    let set = CommandSet::n_set_rq(2, uids::MODALITY_PERFORMED_PROCEDURE_STEP, "1.9.9.1");
    send_message(&mut association, pc_id, &set, Some(&completion)).unwrap();
    let (_, response) = receive_message(&mut association).unwrap();
    assert_eq!(response.command.status().unwrap(), Status::SUCCESS);

    association.release().unwrap();
    worker.join().unwrap();

    let record = context.mpps.get("1.9.9.1").expect("step stored");
    assert_eq!(
        record
            .string(tags::PERFORMED_PROCEDURE_STEP_STATUS)
            .unwrap(),
        "COMPLETED"
    );
}
