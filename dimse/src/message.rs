//! DIMSE message assembly and disassembly over an association.
//!
//! Sending splits the encoded command set and data set into
//! presentation data values bounded by the peer's maximum PDU size.
//! Receiving buffers command fragments until the last one arrives,
//! parses the command set, and (when announced) buffers and decodes
//! the data set under the presentation context's transfer syntax.

use crate::command::CommandSet;
use pacs_object::{read_dataset, write_dataset, InMemObject};
use pacs_transfer_syntax_registry::TransferSyntaxRegistry;
use pacs_ul::association::Association;
use pacs_ul::pdu::{PDataValue, PDataValueType, Pdu};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};

/// A failure during message exchange.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("association failure"))]
    Association {
        #[snafu(backtrace)]
        source: pacs_ul::association::Error,
    },
    #[snafu(display("command set failure"))]
    Command {
        #[snafu(backtrace)]
        source: crate::command::Error,
    },
    #[snafu(display("could not encode data set"))]
    EncodeData {
        #[snafu(backtrace)]
        source: pacs_object::write::Error,
    },
    #[snafu(display("could not decode data set"))]
    DecodeData {
        #[snafu(backtrace)]
        source: pacs_object::read::Error,
    },
    #[snafu(display("could not write data set fragments"))]
    WriteData {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("presentation context {} was not accepted", id))]
    UnknownPresentationContext { id: u8, backtrace: Backtrace },
    #[snafu(display("transfer syntax {} is not in the registry", uid))]
    UnregisteredTransferSyntax { uid: String, backtrace: Backtrace },
    /// A PDV arrived violating command-before-data ordering
    /// or the last-fragment discipline.
    #[snafu(display("out-of-order presentation data value on context {}", id))]
    OutOfOrderPdv { id: u8, backtrace: Backtrace },
    /// PDVs of two messages interleaved on the same context.
    #[snafu(display("interleaved messages on presentation context {}", id))]
    InterleavedMessages { id: u8, backtrace: Backtrace },
    /// The peer requested release mid-message.
    #[snafu(display("association released while awaiting a message"))]
    ReleasedMidMessage { backtrace: Backtrace },
    /// The peer aborted the association.
    #[snafu(display("association aborted while awaiting a message"))]
    AbortedMidMessage { backtrace: Backtrace },
    #[snafu(display("unexpected {} PDU while awaiting a message", description))]
    UnexpectedPdu {
        description: &'static str,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A whole DIMSE message: the command set plus its optional data set.
#[derive(Debug, Clone)]
pub struct Message {
    /// the command set
    pub command: CommandSet,
    /// the data set, when the command announced one
    pub data: Option<InMemObject>,
}

/// What arrived on an association while awaiting DIMSE traffic.
#[derive(Debug)]
pub enum DimseEvent {
    /// A fully reassembled message on the given presentation context.
    Message {
        presentation_context_id: u8,
        message: Message,
    },
    /// The peer asked to release the association.
    ReleaseRequested,
    /// The peer aborted the association.
    Aborted,
}

/// Send a DIMSE message on the given presentation context.
pub fn send_message<A: Association>(
    association: &mut A,
    presentation_context_id: u8,
    command: &CommandSet,
    data: Option<&InMemObject>,
) -> Result<()> {
    let command_bytes = command.encode().context(CommandSnafu)?;
    // the PDU body must fit the peer's limit:
    // 6 bytes of PDV length + header per PDV
    let max_fragment = (association.max_pdu_send() as usize).saturating_sub(6);

    let mut chunks = command_bytes.chunks(max_fragment).peekable();
    while let Some(chunk) = chunks.next() {
        let pdu = Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id,
                value_type: PDataValueType::Command,
                is_last: chunks.peek().is_none(),
                data: chunk.to_vec(),
            }],
        };
        association.send(&pdu).context(AssociationSnafu)?;
    }

    tracing::trace!(
        presentation_context_id,
        command_len = command_bytes.len(),
        has_data = data.is_some(),
        "sending DIMSE message"
    );

    if let Some(object) = data {
        let ts_uid = association
            .presentation_contexts()
            .iter()
            .find(|pc| pc.id == presentation_context_id)
            .map(|pc| pc.transfer_syntax.clone())
            .context(UnknownPresentationContextSnafu {
                id: presentation_context_id,
            })?;
        let ts = TransferSyntaxRegistry
            .get(&ts_uid)
            .context(UnregisteredTransferSyntaxSnafu { uid: ts_uid })?;

        let mut writer = association.send_pdata(presentation_context_id);
        write_dataset(object, &mut writer, ts).context(EncodeDataSnafu)?;
        writer.finish().context(WriteDataSnafu)?;
    }

    Ok(())
}

/// Await the next DIMSE event on the association:
/// a whole message, a release request, or an abort.
pub fn receive_event<A: Association>(association: &mut A) -> Result<DimseEvent> {
    let mut context_id: Option<u8> = None;
    let mut command_bytes: Vec<u8> = Vec::new();
    let mut data_bytes: Vec<u8> = Vec::new();
    let mut command: Option<CommandSet> = None;

    loop {
        let pdu = association.receive().context(AssociationSnafu)?;
        let pdvs = match pdu {
            Pdu::PData { data } => data,
            Pdu::ReleaseRq => {
                // a release in the middle of a message is a protocol error
                snafu::ensure!(
                    context_id.is_none(),
                    ReleasedMidMessageSnafu
                );
                return Ok(DimseEvent::ReleaseRequested);
            }
            Pdu::AbortRq { .. } => return Ok(DimseEvent::Aborted),
            other => {
                let description = other.short_description();
                let _ = association.abort();
                return UnexpectedPduSnafu { description }.fail();
            }
        };

        for pdv in pdvs {
            let id = pdv.presentation_context_id;
            match context_id {
                None => context_id = Some(id),
                Some(current) => {
                    if current != id {
                        let _ = association.abort();
                        return InterleavedMessagesSnafu { id }.fail();
                    }
                }
            }

            match pdv.value_type {
                PDataValueType::Command => {
                    if command.is_some() {
                        // command fragments after the command completed
                        let _ = association.abort();
                        return OutOfOrderPdvSnafu { id }.fail();
                    }
                    command_bytes.extend_from_slice(&pdv.data);
                    if pdv.is_last {
                        let parsed =
                            CommandSet::decode(&command_bytes).context(CommandSnafu)?;
                        if !parsed.has_data_set() {
                            return Ok(DimseEvent::Message {
                                presentation_context_id: id,
                                message: Message {
                                    command: parsed,
                                    data: None,
                                },
                            });
                        }
                        command = Some(parsed);
                    }
                }
                PDataValueType::Data => {
                    if command.is_none() {
                        // data may not precede its command
                        let _ = association.abort();
                        return OutOfOrderPdvSnafu { id }.fail();
                    }
                    data_bytes.extend_from_slice(&pdv.data);
                    if pdv.is_last {
                        let ts_uid = association
                            .presentation_contexts()
                            .iter()
                            .find(|pc| pc.id == id)
                            .map(|pc| pc.transfer_syntax.clone())
                            .context(UnknownPresentationContextSnafu { id })?;
                        let ts = TransferSyntaxRegistry.get(&ts_uid).context(
                            UnregisteredTransferSyntaxSnafu { uid: ts_uid },
                        )?;
                        let object = read_dataset(&data_bytes, ts).context(DecodeDataSnafu)?;
                        return Ok(DimseEvent::Message {
                            presentation_context_id: id,
                            message: Message {
                                command: command.take().expect("command parsed above"),
                                data: Some(object),
                            },
                        });
                    }
                }
            }
        }
    }
}

/// Await the next whole message, treating release and abort
/// as errors. Intended for SCU flows awaiting a response.
pub fn receive_message<A: Association>(association: &mut A) -> Result<(u8, Message)> {
    match receive_event(association)? {
        DimseEvent::Message {
            presentation_context_id,
            message,
        } => Ok((presentation_context_id, message)),
        DimseEvent::ReleaseRequested => ReleasedMidMessageSnafu.fail(),
        DimseEvent::Aborted => AbortedMidMessageSnafu.fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::{receive_event, send_message, DimseEvent};
    use crate::command::{CommandField, CommandSet};
    use pacs_ul::association::{Association, PDataWriter, Result as UlResult};
    use pacs_ul::pdu::{Pdu, PresentationContextResult, PresentationContextResultReason};
    use std::collections::VecDeque;
    use std::net::TcpStream;

    /// An in-memory association half: everything sent is queued,
    /// receives are popped from a scripted queue.
    struct FakeAssociation {
        contexts: Vec<PresentationContextResult>,
        sent: Vec<Pdu>,
        incoming: VecDeque<Pdu>,
    }

    impl FakeAssociation {
        fn new(ts: &str) -> Self {
            FakeAssociation {
                contexts: vec![PresentationContextResult {
                    id: 1,
                    reason: PresentationContextResultReason::Acceptance,
                    transfer_syntax: ts.to_string(),
                }],
                sent: Vec::new(),
                incoming: VecDeque::new(),
            }
        }
    }

    impl Association for FakeAssociation {
        fn send(&mut self, pdu: &Pdu) -> UlResult<()> {
            self.sent.push(pdu.clone());
            Ok(())
        }

        fn receive(&mut self) -> UlResult<Pdu> {
            Ok(self.incoming.pop_front().expect("scripted PDU"))
        }

        fn presentation_contexts(&self) -> &[PresentationContextResult] {
            &self.contexts
        }

        fn max_pdu_send(&self) -> u32 {
            16384
        }

        fn abort(&mut self) -> UlResult<()> {
            Ok(())
        }

        fn send_pdata(&mut self, _presentation_context_id: u8) -> PDataWriter<&mut TcpStream> {
            unimplemented!("fake associations script PDUs directly")
        }
    }

    #[test]
    fn echo_request_reassembles_from_fragments() {
        let mut association = FakeAssociation::new("1.2.840.10008.1.2.1");
        let bytes = CommandSet::c_echo_rq(1).encode().unwrap();
        let (first, second) = bytes.split_at(bytes.len() / 2);

        association.incoming.push_back(Pdu::PData {
            data: vec![pacs_ul::pdu::PDataValue {
                presentation_context_id: 1,
                value_type: pacs_ul::pdu::PDataValueType::Command,
                is_last: false,
                data: first.to_vec(),
            }],
        });
        association.incoming.push_back(Pdu::PData {
            data: vec![pacs_ul::pdu::PDataValue {
                presentation_context_id: 1,
                value_type: pacs_ul::pdu::PDataValueType::Command,
                is_last: true,
                data: second.to_vec(),
            }],
        });

        match receive_event(&mut association).unwrap() {
            DimseEvent::Message {
                presentation_context_id,
                message,
            } => {
                assert_eq!(presentation_context_id, 1);
                assert_eq!(
                    message.command.command_field().unwrap(),
                    CommandField::CEchoRq
                );
                assert!(message.data.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn data_before_command_is_rejected() {
        let mut association = FakeAssociation::new("1.2.840.10008.1.2.1");
        association.incoming.push_back(Pdu::PData {
            data: vec![pacs_ul::pdu::PDataValue {
                presentation_context_id: 1,
                value_type: pacs_ul::pdu::PDataValueType::Data,
                is_last: true,
                data: vec![0x00; 8],
            }],
        });
        assert!(matches!(
            receive_event(&mut association),
            Err(super::Error::OutOfOrderPdv { .. })
        ));
    }

    #[test]
    fn echo_request_sends_one_final_command_pdv() {
        let mut association = FakeAssociation::new("1.2.840.10008.1.2.1");
        let rq = CommandSet::c_echo_rq(3);
        send_message(&mut association, 1, &rq, None).unwrap();

        assert_eq!(association.sent.len(), 1);
        match &association.sent[0] {
            Pdu::PData { data } => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].presentation_context_id, 1);
                assert!(data[0].is_last);
                assert_eq!(
                    data[0].value_type,
                    pacs_ul::pdu::PDataValueType::Command
                );
                let back = CommandSet::decode(&data[0].data).unwrap();
                assert_eq!(back.message_id().unwrap(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
