//! PDU writing: byte-exact serialization per PS3.8 §9.3.

use crate::pdu::*;
use byteordered::byteorder::{BigEndian, ByteOrder};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Write;

/// The possible failures when writing a PDU.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not write PDU field `{}`", field))]
    WritePduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Serialize one PDU to the given writer.
pub fn write_pdu<W>(writer: &mut W, pdu: &Pdu) -> Result<()>
where
    W: Write,
{
    let (pdu_type, payload) = match pdu {
        Pdu::AssociationRq {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        } => {
            let mut payload = associate_preface(*protocol_version, called_ae_title, calling_ae_title);
            payload.extend(item(0x10, application_context_name.as_bytes()));
            for pc in presentation_contexts {
                let mut sub = vec![pc.id, 0, 0, 0];
                sub.extend(item(0x30, pc.abstract_syntax.as_bytes()));
                for ts in &pc.transfer_syntaxes {
                    sub.extend(item(0x40, ts.as_bytes()));
                }
                payload.extend(item(0x20, &sub));
            }
            payload.extend(user_information(user_variables));
            (0x01, payload)
        }
        Pdu::AssociationAc {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        } => {
            let mut payload = associate_preface(*protocol_version, called_ae_title, calling_ae_title);
            payload.extend(item(0x10, application_context_name.as_bytes()));
            for pc in presentation_contexts {
                let mut sub = vec![pc.id, 0, pc.reason as u8, 0];
                sub.extend(item(0x40, pc.transfer_syntax.as_bytes()));
                payload.extend(item(0x21, &sub));
            }
            payload.extend(user_information(user_variables));
            (0x02, payload)
        }
        Pdu::AssociationRj { result, source } => {
            let (source_byte, reason_byte) = source.to_parts();
            (0x03, vec![0, *result as u8, source_byte, reason_byte])
        }
        Pdu::PData { data } => {
            let mut payload = Vec::new();
            for pdv in data {
                let mut length_bytes = [0u8; 4];
                BigEndian::write_u32(&mut length_bytes, pdv.data.len() as u32 + 2);
                payload.extend_from_slice(&length_bytes);
                payload.push(pdv.presentation_context_id);
                let mut header = 0u8;
                if pdv.value_type == PDataValueType::Command {
                    header |= 0x01;
                }
                if pdv.is_last {
                    header |= 0x02;
                }
                payload.push(header);
                payload.extend_from_slice(&pdv.data);
            }
            (0x04, payload)
        }
        Pdu::ReleaseRq => (0x05, vec![0, 0, 0, 0]),
        Pdu::ReleaseRp => (0x06, vec![0, 0, 0, 0]),
        Pdu::AbortRq { source } => {
            let (source_byte, reason_byte) = source.to_parts();
            (0x07, vec![0, 0, source_byte, reason_byte])
        }
        Pdu::Unknown { pdu_type, data } => (*pdu_type, data.clone()),
    };

    let mut header = [0u8; 6];
    header[0] = pdu_type;
    BigEndian::write_u32(&mut header[2..6], payload.len() as u32);
    writer
        .write_all(&header)
        .context(WritePduFieldSnafu { field: "header" })?;
    writer
        .write_all(&payload)
        .context(WritePduFieldSnafu { field: "payload" })?;
    Ok(())
}

/// The fixed part of A-ASSOCIATE-RQ/AC before the variable items.
fn associate_preface(protocol_version: u16, called: &str, calling: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(68);
    let mut version = [0u8; 2];
    BigEndian::write_u16(&mut version, protocol_version);
    payload.extend_from_slice(&version);
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&ae_title_bytes(called));
    payload.extend_from_slice(&ae_title_bytes(calling));
    payload.extend_from_slice(&[0u8; 32]);
    payload
}

/// Encode an AE title as 16 ASCII bytes, right-padded with spaces.
fn ae_title_bytes(title: &str) -> [u8; 16] {
    let mut out = [b' '; 16];
    for (slot, b) in out.iter_mut().zip(title.bytes().take(16)) {
        *slot = b;
    }
    out
}

/// Encode one variable item: type, reserved, 2-byte length, payload.
fn item(item_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.push(item_type);
    out.push(0);
    let mut length = [0u8; 2];
    BigEndian::write_u16(&mut length, payload.len() as u16);
    out.extend_from_slice(&length);
    out.extend_from_slice(payload);
    out
}

/// Encode the user information item and its sub-items.
fn user_information(variables: &[UserVariableItem]) -> Vec<u8> {
    let mut sub = Vec::new();
    for var in variables {
        match var {
            UserVariableItem::MaxLength(max) => {
                let mut value = [0u8; 4];
                BigEndian::write_u32(&mut value, *max);
                sub.extend(item(0x51, &value));
            }
            UserVariableItem::ImplementationClassUid(uid) => {
                sub.extend(item(0x52, uid.as_bytes()));
            }
            UserVariableItem::ImplementationVersionName(name) => {
                sub.extend(item(0x55, name.as_bytes()));
            }
            UserVariableItem::Unknown(sub_type, payload) => {
                sub.extend(item(*sub_type, payload));
            }
        }
    }
    item(0x50, &sub)
}

#[cfg(test)]
mod tests {
    use super::write_pdu;
    use crate::pdu::reader::read_pdu;
    use crate::pdu::*;

    fn round_trip(pdu: Pdu) -> Pdu {
        let mut bytes = Vec::new();
        write_pdu(&mut bytes, &pdu).unwrap();
        read_pdu(&mut bytes.as_slice(), MAXIMUM_PDU_SIZE, true).unwrap()
    }

    #[test]
    fn associate_rq_round_trip() {
        let pdu = Pdu::AssociationRq {
            protocol_version: 1,
            calling_ae_title: "STORE-SCU".to_string(),
            called_ae_title: "MAIN-PACS".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![PresentationContextProposed {
                id: 1,
                abstract_syntax: "1.2.840.10008.1.1".to_string(),
                transfer_syntaxes: vec![
                    "1.2.840.10008.1.2.1".to_string(),
                    "1.2.840.10008.1.2".to_string(),
                ],
            }],
            user_variables: vec![
                UserVariableItem::MaxLength(16384),
                UserVariableItem::ImplementationClassUid("2.25.1".to_string()),
                UserVariableItem::ImplementationVersionName("PACS-RS 0.1.0".to_string()),
            ],
        };
        assert_eq!(round_trip(pdu.clone()), pdu);
    }

    #[test]
    fn associate_ac_round_trip() {
        let pdu = Pdu::AssociationAc {
            protocol_version: 1,
            calling_ae_title: "STORE-SCU".to_string(),
            called_ae_title: "MAIN-PACS".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![
                PresentationContextResult {
                    id: 1,
                    reason: PresentationContextResultReason::Acceptance,
                    transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
                },
                PresentationContextResult {
                    id: 3,
                    reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                    transfer_syntax: "1.2.840.10008.1.2".to_string(),
                },
            ],
            user_variables: vec![UserVariableItem::MaxLength(32768)],
        };
        assert_eq!(round_trip(pdu.clone()), pdu);
    }

    #[test]
    fn associate_rj_round_trip() {
        let pdu = Pdu::AssociationRj {
            result: AssociationRjResult::Permanent,
            source: AssociationRjSource::ServiceUser(
                ServiceUserReason::CallingAeTitleNotRecognized,
            ),
        };
        let mut bytes = Vec::new();
        write_pdu(&mut bytes, &pdu).unwrap();
        // type 03, reserved, length 4, then reserved/result/source/reason
        assert_eq!(bytes, vec![0x03, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x01, 0x01, 0x03]);
        assert_eq!(round_trip(pdu.clone()), pdu);
    }

    #[test]
    fn pdata_round_trip() {
        let pdu = Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: 1,
                value_type: PDataValueType::Command,
                is_last: true,
                data: vec![0xAA, 0xBB, 0xCC, 0xDD],
            }],
        };
        assert_eq!(round_trip(pdu.clone()), pdu);
    }

    #[test]
    fn release_and_abort_round_trip() {
        assert_eq!(round_trip(Pdu::ReleaseRq), Pdu::ReleaseRq);
        assert_eq!(round_trip(Pdu::ReleaseRp), Pdu::ReleaseRp);
        let abort = Pdu::AbortRq {
            source: AbortSource::ServiceProvider(AbortServiceProviderReason::UnexpectedPdu),
        };
        assert_eq!(round_trip(abort.clone()), abort);
    }

    #[test]
    fn oversized_pdu_is_rejected_in_strict_mode() {
        let pdu = Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: 1,
                value_type: PDataValueType::Data,
                is_last: true,
                data: vec![0u8; MINIMUM_PDU_SIZE as usize + 1],
            }],
        };
        let mut bytes = Vec::new();
        write_pdu(&mut bytes, &pdu).unwrap();
        // the PDU body is six bytes over the PDV payload;
        // a limit of exactly the body size passes,
        // one byte less must be rejected
        let body_len = bytes.len() as u32 - 6;
        assert!(read_pdu(&mut bytes.as_slice(), body_len, true).is_ok());
        let err = read_pdu(&mut bytes.as_slice(), body_len - 1, true).unwrap_err();
        assert!(matches!(
            err,
            crate::pdu::reader::Error::PduTooLarge { .. }
        ));
    }
}
