//! Association negotiation and data transfer over a loopback socket.

use pacs_ul::association::server::AccessControl;
use pacs_ul::pdu::{
    AssociationRjResult, AssociationRjSource, PDataValue, PDataValueType, Pdu, ServiceUserReason,
};
use pacs_ul::{Association, ClientAssociationOptions, ServerAssociationOptions};
use std::net::TcpListener;
use std::thread;

static VERIFICATION: &str = "1.2.840.10008.1.1";
static EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

#[test]
fn establish_exchange_and_release() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _peer) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new()
            .ae_title("TEST-SCP")
            .with_abstract_syntax(VERIFICATION)
            .with_transfer_syntax(EXPLICIT_VR_LE);
        let mut association = options.establish(stream).unwrap();
        assert_eq!(association.client_ae_title(), "TEST-SCU");

        // echo one P-DATA PDU back verbatim
        let pdu = association.receive().unwrap();
        match &pdu {
            Pdu::PData { data } => {
                assert_eq!(data[0].data, vec![0x01, 0x02, 0x03, 0x04]);
            }
            other => panic!("unexpected {:?}", other),
        }
        association.send(&pdu).unwrap();

        match association.receive().unwrap() {
            Pdu::ReleaseRq => association.confirm_release().unwrap(),
            other => panic!("unexpected {:?}", other),
        }
    });

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("TEST-SCU")
        .called_ae_title("TEST-SCP")
        .with_presentation_context(VERIFICATION, vec![EXPLICIT_VR_LE])
        .establish(addr)
        .unwrap();

    let contexts = association.presentation_contexts();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].transfer_syntax, EXPLICIT_VR_LE);
    let pc_id = contexts[0].id;

    association
        .send(&Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: pc_id,
                value_type: PDataValueType::Command,
                is_last: true,
                data: vec![0x01, 0x02, 0x03, 0x04],
            }],
        })
        .unwrap();

    match association.receive().unwrap() {
        Pdu::PData { data } => assert_eq!(data[0].data, vec![0x01, 0x02, 0x03, 0x04]),
        other => panic!("unexpected {:?}", other),
    }

    association.release().unwrap();
    server.join().unwrap();
}

#[test]
fn calling_ae_title_not_on_allow_list_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _peer) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new()
            .ae_title("TEST-SCP")
            .ae_access_control(AccessControl::AllowCallingAeTitles(vec![
                "GOOD_SCU".to_string()
            ]))
            .with_abstract_syntax(VERIFICATION);
        let err = options.establish(stream).unwrap_err();
        assert!(matches!(
            err,
            pacs_ul::association::Error::Rejected { .. }
        ));
    });

    let err = ClientAssociationOptions::new()
        .calling_ae_title("BAD_SCU")
        .called_ae_title("TEST-SCP")
        .with_presentation_context(VERIFICATION, vec![EXPLICIT_VR_LE])
        .establish(addr)
        .unwrap_err();

    match err {
        pacs_ul::association::Error::Rejected {
            result,
            reject_source,
            ..
        } => {
            assert_eq!(result, AssociationRjResult::Permanent);
            assert_eq!(
                reject_source,
                AssociationRjSource::ServiceUser(ServiceUserReason::CallingAeTitleNotRecognized)
            );
        }
        other => panic!("unexpected {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn no_acceptable_context_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _peer) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new()
            .ae_title("TEST-SCP")
            .with_abstract_syntax("1.2.840.10008.5.1.4.1.1.2");
        let _ = options.establish(stream);
    });

    let err = ClientAssociationOptions::new()
        .calling_ae_title("TEST-SCU")
        .called_ae_title("TEST-SCP")
        .with_presentation_context(VERIFICATION, vec![EXPLICIT_VR_LE])
        .establish(addr)
        .unwrap_err();
    assert!(matches!(
        err,
        pacs_ul::association::Error::Rejected { .. }
    ));
    server.join().unwrap();
}
