//! PDU reading: byte-exact parsing per PS3.8 §9.3.

use crate::pdu::*;
use byteordered::byteorder::{BigEndian, ReadBytesExt};
use pacs_encoding::text::{DefaultCharacterSetCodec, TextCodec};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};

/// The possible failures when reading a PDU from a stream.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("invalid maximum PDU length {}", max_pdu_length))]
    InvalidMaxPdu {
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    /// The stream ended cleanly before a PDU began.
    #[snafu(display("no PDU available"))]
    NoPduAvailable { backtrace: Backtrace },

    #[snafu(display("could not read PDU"))]
    ReadPdu {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not read PDU field `{}`", field))]
    ReadPduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not read {} reserved bytes", bytes))]
    ReadReserved {
        bytes: u32,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "incoming PDU of {} bytes exceeds the maximum of {}",
        pdu_length,
        max_pdu_length
    ))]
    PduTooLarge {
        pdu_length: u32,
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("invalid item length {} (must be >= 2)", length))]
    InvalidItemLength { length: u32, backtrace: Backtrace },

    #[snafu(display("PDU contained an invalid variable item {:?}", var_item))]
    InvalidPduVariable {
        var_item: PduVariableItem,
        backtrace: Backtrace,
    },
    #[snafu(display("invalid reject source or reason"))]
    InvalidRejectSourceOrReason { backtrace: Backtrace },
    #[snafu(display("invalid abort source or reason"))]
    InvalidAbortSourceOrReason { backtrace: Backtrace },
    #[snafu(display("invalid presentation context result reason"))]
    InvalidPresentationContextResultReason { backtrace: Backtrace },
    #[snafu(display("could not decode text field `{}`", field))]
    DecodeText {
        field: &'static str,
        #[snafu(backtrace)]
        source: pacs_encoding::text::DecodeTextError,
    },
    #[snafu(display("missing application context name"))]
    MissingApplicationContextName { backtrace: Backtrace },
    #[snafu(display("missing abstract syntax"))]
    MissingAbstractSyntax { backtrace: Backtrace },
    #[snafu(display("missing transfer syntax"))]
    MissingTransferSyntax { backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Read one PDU from the stream.
///
/// `max_pdu_length` bounds the incoming PDU length.
/// In strict mode a PDU even one byte over the limit is rejected;
/// otherwise it is tolerated up to the absolute maximum,
/// with a warning.
pub fn read_pdu<R>(reader: &mut R, max_pdu_length: u32, strict: bool) -> Result<Pdu>
where
    R: Read,
{
    ensure!(
        (MINIMUM_PDU_SIZE..=MAXIMUM_PDU_SIZE).contains(&max_pdu_length),
        InvalidMaxPduSnafu { max_pdu_length }
    );

    // Failing to read the first two bytes means no PDU arrived at all,
    // which release/close handling treats differently from a PDU
    // truncated halfway.
    let mut bytes = [0; 2];
    if let Err(e) = reader.read_exact(&mut bytes) {
        ensure!(e.kind() != ErrorKind::UnexpectedEof, NoPduAvailableSnafu);
        return Err(e).context(ReadPduFieldSnafu { field: "type" });
    }

    let pdu_type = bytes[0];
    let pdu_length = reader
        .read_u32::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "length" })?;

    if strict {
        ensure!(
            pdu_length <= max_pdu_length,
            PduTooLargeSnafu {
                pdu_length,
                max_pdu_length
            }
        );
    } else {
        ensure!(
            pdu_length <= MAXIMUM_PDU_SIZE,
            PduTooLargeSnafu {
                pdu_length,
                max_pdu_length: MAXIMUM_PDU_SIZE
            }
        );
        if pdu_length > max_pdu_length {
            tracing::warn!(
                pdu_length,
                max_pdu_length,
                "tolerating over-sized incoming PDU"
            );
        }
    }

    let mut body = vec![0; pdu_length as usize];
    reader.read_exact(&mut body).context(ReadPduSnafu)?;
    let mut cursor = Cursor::new(body);
    let codec = DefaultCharacterSetCodec;

    match pdu_type {
        0x01 | 0x02 => {
            // A-ASSOCIATE-RQ / A-ASSOCIATE-AC share their layout:
            // protocol version, reserved, called AE, calling AE,
            // 32 reserved bytes, then variable items.
            let protocol_version = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "Protocol-version",
            })?;
            cursor
                .read_u16::<BigEndian>()
                .context(ReadReservedSnafu { bytes: 2_u32 })?;

            let mut ae_bytes = [0; 16];
            cursor.read_exact(&mut ae_bytes).context(ReadPduFieldSnafu {
                field: "Called-AE-title",
            })?;
            let called_ae_title = codec
                .decode(&ae_bytes)
                .context(DecodeTextSnafu {
                    field: "Called-AE-title",
                })?
                .trim()
                .to_string();

            let mut ae_bytes = [0; 16];
            cursor.read_exact(&mut ae_bytes).context(ReadPduFieldSnafu {
                field: "Calling-AE-title",
            })?;
            let calling_ae_title = codec
                .decode(&ae_bytes)
                .context(DecodeTextSnafu {
                    field: "Calling-AE-title",
                })?
                .trim()
                .to_string();

            cursor
                .seek(SeekFrom::Current(32))
                .context(ReadReservedSnafu { bytes: 32_u32 })?;

            let mut application_context_name: Option<String> = None;
            let mut proposed = vec![];
            let mut results = vec![];
            let mut user_variables = vec![];

            while cursor.position() < cursor.get_ref().len() as u64 {
                match read_pdu_variable(&mut cursor, &codec)? {
                    PduVariableItem::ApplicationContext(val) => {
                        application_context_name = Some(val);
                    }
                    PduVariableItem::PresentationContextProposed(val) => proposed.push(val),
                    PduVariableItem::PresentationContextResult(val) => results.push(val),
                    PduVariableItem::UserVariables(val) => user_variables = val,
                    var_item @ PduVariableItem::Unknown(_) => {
                        tracing::debug!(?var_item, "ignoring unknown PDU item");
                    }
                }
            }

            let application_context_name =
                application_context_name.context(MissingApplicationContextNameSnafu)?;

            if pdu_type == 0x01 {
                ensure!(
                    results.is_empty(),
                    InvalidPduVariableSnafu {
                        var_item: PduVariableItem::PresentationContextResult(
                            results.swap_remove(0)
                        )
                    }
                );
                Ok(Pdu::AssociationRq {
                    protocol_version,
                    calling_ae_title,
                    called_ae_title,
                    application_context_name,
                    presentation_contexts: proposed,
                    user_variables,
                })
            } else {
                ensure!(
                    proposed.is_empty(),
                    InvalidPduVariableSnafu {
                        var_item: PduVariableItem::PresentationContextProposed(
                            proposed.swap_remove(0)
                        )
                    }
                );
                Ok(Pdu::AssociationAc {
                    protocol_version,
                    calling_ae_title,
                    called_ae_title,
                    application_context_name,
                    presentation_contexts: results,
                    user_variables,
                })
            }
        }
        0x03 => {
            // A-ASSOCIATE-RJ
            cursor
                .read_u8()
                .context(ReadReservedSnafu { bytes: 1_u32 })?;
            let result = AssociationRjResult::from_u8(
                cursor
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "Result" })?,
            )
            .context(InvalidRejectSourceOrReasonSnafu)?;
            let source_byte = cursor
                .read_u8()
                .context(ReadPduFieldSnafu { field: "Source" })?;
            let reason_byte = cursor
                .read_u8()
                .context(ReadPduFieldSnafu { field: "Reason" })?;
            let source = AssociationRjSource::from_parts(source_byte, reason_byte)
                .context(InvalidRejectSourceOrReasonSnafu)?;
            Ok(Pdu::AssociationRj { result, source })
        }
        0x04 => {
            // P-DATA-TF: a sequence of presentation data values
            let mut values = vec![];
            let len = cursor.get_ref().len() as u64;
            while cursor.position() < len {
                let pdv_length = cursor.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "PDV-length",
                })?;
                ensure!(
                    pdv_length >= 2,
                    InvalidItemLengthSnafu { length: pdv_length }
                );
                let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Presentation-context-ID",
                })?;
                let header = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Message-control-header",
                })?;
                let value_type = if header & 0x01 != 0 {
                    PDataValueType::Command
                } else {
                    PDataValueType::Data
                };
                let is_last = header & 0x02 != 0;

                let mut data = vec![0; pdv_length as usize - 2];
                cursor.read_exact(&mut data).context(ReadPduFieldSnafu {
                    field: "PDV-data",
                })?;

                values.push(PDataValue {
                    presentation_context_id,
                    value_type,
                    is_last,
                    data,
                });
            }
            Ok(Pdu::PData { data: values })
        }
        0x05 => Ok(Pdu::ReleaseRq),
        0x06 => Ok(Pdu::ReleaseRp),
        0x07 => {
            // A-ABORT
            cursor
                .read_u16::<BigEndian>()
                .context(ReadReservedSnafu { bytes: 2_u32 })?;
            let source_byte = cursor
                .read_u8()
                .context(ReadPduFieldSnafu { field: "Source" })?;
            let reason_byte = cursor
                .read_u8()
                .context(ReadPduFieldSnafu { field: "Reason" })?;
            let source = AbortSource::from_parts(source_byte, reason_byte)
                .context(InvalidAbortSourceOrReasonSnafu)?;
            Ok(Pdu::AbortRq { source })
        }
        _ => Ok(Pdu::Unknown {
            pdu_type,
            data: cursor.into_inner(),
        }),
    }
}

fn read_pdu_variable(
    cursor: &mut Cursor<Vec<u8>>,
    codec: &DefaultCharacterSetCodec,
) -> Result<PduVariableItem> {
    let item_type = cursor
        .read_u8()
        .context(ReadPduFieldSnafu { field: "Item-type" })?;
    cursor
        .read_u8()
        .context(ReadReservedSnafu { bytes: 1_u32 })?;
    let item_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
    })?;
    let mut payload = vec![0; item_length as usize];
    cursor.read_exact(&mut payload).context(ReadPduFieldSnafu {
        field: "Item-value",
    })?;

    match item_type {
        0x10 => {
            // application context item
            let name = codec
                .decode(&payload)
                .context(DecodeTextSnafu {
                    field: "Application-context-name",
                })?
                .trim()
                .to_string();
            Ok(PduVariableItem::ApplicationContext(name))
        }
        0x20 => {
            // presentation context item (proposal)
            let mut sub = Cursor::new(payload);
            let id = sub.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
            })?;
            sub.seek(SeekFrom::Current(3))
                .context(ReadReservedSnafu { bytes: 3_u32 })?;

            let mut abstract_syntax: Option<String> = None;
            let mut transfer_syntaxes = vec![];
            while sub.position() < sub.get_ref().len() as u64 {
                let (sub_type, sub_payload) = read_sub_item(&mut sub)?;
                match sub_type {
                    0x30 => {
                        abstract_syntax = Some(decode_uid(&sub_payload, codec, "Abstract-syntax")?);
                    }
                    0x40 => {
                        transfer_syntaxes.push(decode_uid(&sub_payload, codec, "Transfer-syntax")?);
                    }
                    _ => {
                        tracing::debug!(sub_type, "ignoring unknown presentation context sub-item");
                    }
                }
            }

            Ok(PduVariableItem::PresentationContextProposed(
                PresentationContextProposed {
                    id,
                    abstract_syntax: abstract_syntax.context(MissingAbstractSyntaxSnafu)?,
                    transfer_syntaxes,
                },
            ))
        }
        0x21 => {
            // presentation context item (result)
            let mut sub = Cursor::new(payload);
            let id = sub.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
            })?;
            sub.read_u8().context(ReadReservedSnafu { bytes: 1_u32 })?;
            let reason = PresentationContextResultReason::from_u8(
                sub.read_u8()
                    .context(ReadPduFieldSnafu { field: "Result" })?,
            )
            .context(InvalidPresentationContextResultReasonSnafu)?;
            sub.read_u8().context(ReadReservedSnafu { bytes: 1_u32 })?;

            let mut transfer_syntax: Option<String> = None;
            while sub.position() < sub.get_ref().len() as u64 {
                let (sub_type, sub_payload) = read_sub_item(&mut sub)?;
                if sub_type == 0x40 {
                    transfer_syntax = Some(decode_uid(&sub_payload, codec, "Transfer-syntax")?);
                }
            }

            Ok(PduVariableItem::PresentationContextResult(
                PresentationContextResult {
                    id,
                    reason,
                    transfer_syntax: transfer_syntax.context(MissingTransferSyntaxSnafu)?,
                },
            ))
        }
        0x50 => {
            // user information item
            let mut sub = Cursor::new(payload);
            let mut variables = vec![];
            while sub.position() < sub.get_ref().len() as u64 {
                let (sub_type, sub_payload) = read_sub_item(&mut sub)?;
                match sub_type {
                    0x51 => {
                        let mut value = Cursor::new(sub_payload);
                        let max_length =
                            value.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                                field: "Maximum-length-received",
                            })?;
                        variables.push(UserVariableItem::MaxLength(max_length));
                    }
                    0x52 => {
                        variables.push(UserVariableItem::ImplementationClassUid(decode_uid(
                            &sub_payload,
                            codec,
                            "Implementation-class-UID",
                        )?));
                    }
                    0x55 => {
                        variables.push(UserVariableItem::ImplementationVersionName(decode_uid(
                            &sub_payload,
                            codec,
                            "Implementation-version-name",
                        )?));
                    }
                    _ => {
                        variables.push(UserVariableItem::Unknown(sub_type, sub_payload));
                    }
                }
            }
            Ok(PduVariableItem::UserVariables(variables))
        }
        _ => Ok(PduVariableItem::Unknown(item_type)),
    }
}

fn read_sub_item(cursor: &mut Cursor<Vec<u8>>) -> Result<(u8, Vec<u8>)> {
    let sub_type = cursor
        .read_u8()
        .context(ReadPduFieldSnafu { field: "Item-type" })?;
    cursor
        .read_u8()
        .context(ReadReservedSnafu { bytes: 1_u32 })?;
    let length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
    })?;
    let mut payload = vec![0; length as usize];
    cursor.read_exact(&mut payload).context(ReadPduFieldSnafu {
        field: "Item-value",
    })?;
    Ok((sub_type, payload))
}

fn decode_uid(
    payload: &[u8],
    codec: &DefaultCharacterSetCodec,
    field: &'static str,
) -> Result<String> {
    Ok(codec
        .decode(payload)
        .context(DecodeTextSnafu { field })?
        .trim_end_matches(|c| c == ' ' || c == '\0')
        .to_string())
}
