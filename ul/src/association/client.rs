//! Association requestor module.
//!
//! [`ClientAssociationOptions`] negotiates an association with a
//! remote application entity, yielding a [`ClientAssociation`]
//! in data-transfer state on success.

use crate::association::pdata::PDataWriter;
use crate::association::{
    event_for_received, event_for_sent, receive_limit, send_limit, AbortedSnafu, Association,
    ConnectSnafu, MissingAbstractSyntaxSnafu, NoAcceptedPresentationContextsSnafu,
    ProtocolStateSnafu, ReceivePduSnafu, RejectedSnafu, Result, SendPduSnafu, SocketOptionSnafu,
    UnexpectedPduSnafu, WireSendSnafu,
};
use crate::pdu::reader::read_pdu;
use crate::pdu::writer::write_pdu;
use crate::pdu::{
    AbortSource, PDataValueType, Pdu, PresentationContextProposed, PresentationContextResult,
    UserVariableItem, DEFAULT_MAX_PDU,
};
use crate::state::{Event, State};
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};
use snafu::{IntoError, ResultExt};
use std::borrow::Cow;
use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A builder for negotiating an association as the requesting node,
/// usually taking the role of a service class user.
///
/// ## Example
///
/// ```no_run
/// # use pacs_ul::ClientAssociationOptions;
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut association = ClientAssociationOptions::new()
///     .calling_ae_title("ECHO-SCU")
///     .called_ae_title("MAIN-PACS")
///     .with_presentation_context("1.2.840.10008.1.1", vec!["1.2.840.10008.1.2.1"])
///     .establish("127.0.0.1:11112")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientAssociationOptions<'a> {
    calling_ae_title: Cow<'a, str>,
    called_ae_title: Cow<'a, str>,
    application_context_name: Cow<'a, str>,
    presentation_contexts: Vec<(String, Vec<String>)>,
    protocol_version: u16,
    max_pdu_length: u32,
    strict: bool,
    connect_timeout: Option<Duration>,
    artim_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl Default for ClientAssociationOptions<'_> {
    fn default() -> Self {
        ClientAssociationOptions {
            calling_ae_title: "THIS-SCU".into(),
            called_ae_title: "ANY-SCP".into(),
            // the DICOM application context name, the only one defined
            application_context_name: "1.2.840.10008.3.1.1.1".into(),
            presentation_contexts: Vec::new(),
            protocol_version: 1,
            max_pdu_length: DEFAULT_MAX_PDU,
            strict: true,
            connect_timeout: None,
            artim_timeout: Some(Duration::from_secs(30)),
            read_timeout: None,
        }
    }
}

impl<'a> ClientAssociationOptions<'a> {
    /// Create a new set of options for establishing an association.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the application entity title of this requestor.
    pub fn calling_ae_title<T>(mut self, title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.calling_ae_title = title.into();
        self
    }

    /// Define the application entity title of the target node.
    pub fn called_ae_title<T>(mut self, title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.called_ae_title = title.into();
        self
    }

    /// Propose a presentation context with the given abstract syntax
    /// and one or more transfer syntaxes, in preference order.
    pub fn with_presentation_context<T>(
        mut self,
        abstract_syntax: T,
        transfer_syntaxes: Vec<T>,
    ) -> Self
    where
        T: Into<String>,
    {
        self.presentation_contexts.push((
            abstract_syntax.into(),
            transfer_syntaxes.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Override the maximum PDU size advertised to the peer.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value;
        self
    }

    /// Override strict mode: whether incoming PDUs over the
    /// advertised maximum are rejected.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the timeout for the TCP connection attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the ARTIM timer applied while awaiting negotiation
    /// and release responses.
    pub fn artim_timeout(mut self, timeout: Duration) -> Self {
        self.artim_timeout = Some(timeout);
        self
    }

    /// Set the read timeout applied between PDUs
    /// in data-transfer state.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Negotiate an association with the node at the given address.
    pub fn establish<A: ToSocketAddrs + std::fmt::Debug>(
        self,
        address: A,
    ) -> Result<ClientAssociation> {
        snafu::ensure!(
            !self.presentation_contexts.is_empty(),
            MissingAbstractSyntaxSnafu
        );
        let address_description = format!("{:?}", address);

        let stream = match self.connect_timeout {
            Some(timeout) => {
                let addr = address
                    .to_socket_addrs()
                    .context(ConnectSnafu {
                        address: address_description.clone(),
                    })?
                    .next()
                    .ok_or_else(|| {
                        ConnectSnafu {
                            address: address_description.clone(),
                        }
                        .into_error(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "no socket address resolved",
                        ))
                    })?;
                TcpStream::connect_timeout(&addr, timeout).context(ConnectSnafu {
                    address: address_description.clone(),
                })?
            }
            None => TcpStream::connect(&address).context(ConnectSnafu {
                address: address_description.clone(),
            })?,
        };

        // ARTIM governs the negotiation phase
        stream
            .set_read_timeout(self.artim_timeout)
            .context(SocketOptionSnafu)?;

        let presentation_contexts: Vec<PresentationContextProposed> = self
            .presentation_contexts
            .iter()
            .enumerate()
            .map(|(i, (abstract_syntax, transfer_syntaxes))| PresentationContextProposed {
                id: (i as u8) * 2 + 1,
                abstract_syntax: abstract_syntax.clone(),
                transfer_syntaxes: transfer_syntaxes.clone(),
            })
            .collect();

        let rq = Pdu::AssociationRq {
            protocol_version: self.protocol_version,
            calling_ae_title: self.calling_ae_title.to_string(),
            called_ae_title: self.called_ae_title.to_string(),
            application_context_name: self.application_context_name.to_string(),
            presentation_contexts,
            user_variables: vec![
                UserVariableItem::MaxLength(self.max_pdu_length),
                UserVariableItem::ImplementationClassUid(IMPLEMENTATION_CLASS_UID.to_string()),
                UserVariableItem::ImplementationVersionName(
                    IMPLEMENTATION_VERSION_NAME.to_string(),
                ),
            ],
        };

        let proposed_abstract_syntaxes: Vec<(u8, String)> = self
            .presentation_contexts
            .iter()
            .enumerate()
            .map(|(i, (abstract_syntax, _))| ((i as u8) * 2 + 1, abstract_syntax.clone()))
            .collect();

        let mut association = ClientAssociation {
            stream,
            state: State::Sta1,
            presentation_contexts: Vec::new(),
            abstract_syntaxes: proposed_abstract_syntaxes,
            peer_max_pdu: DEFAULT_MAX_PDU,
            own_max_pdu: self.max_pdu_length,
            strict: self.strict,
            artim_timeout: self.artim_timeout,
            read_timeout: self.read_timeout,
            buffer: Vec::with_capacity(DEFAULT_MAX_PDU as usize),
        };

        association.send(&rq)?;

        let response = association.receive_any()?;
        match response {
            Pdu::AssociationAc {
                presentation_contexts,
                user_variables,
                ..
            } => {
                let accepted: Vec<PresentationContextResult> = presentation_contexts
                    .into_iter()
                    .filter(PresentationContextResult::is_accepted)
                    .collect();
                if accepted.is_empty() {
                    let _ = association.abort();
                    return NoAcceptedPresentationContextsSnafu.fail();
                }
                association.presentation_contexts = accepted;
                association.peer_max_pdu = max_length_of(&user_variables);
                // data-transfer state uses the DIMSE timeout
                association
                    .stream
                    .set_read_timeout(association.read_timeout)
                    .context(SocketOptionSnafu)?;
                Ok(association)
            }
            Pdu::AssociationRj { result, source } => {
                let _ = association.stream.shutdown(Shutdown::Both);
                RejectedSnafu {
                    result,
                    reject_source: source,
                }
                .fail()
            }
            Pdu::AbortRq { source } => AbortedSnafu {
                abort_source: source,
            }
            .fail(),
            other => {
                let description = other.short_description();
                let _ = association.abort();
                UnexpectedPduSnafu { description }.fail()
            }
        }
    }
}

/// An established association, from the requestor side.
#[derive(Debug)]
pub struct ClientAssociation {
    stream: TcpStream,
    state: State,
    presentation_contexts: Vec<PresentationContextResult>,
    /// proposed abstract syntax of each context, by context id
    abstract_syntaxes: Vec<(u8, String)>,
    peer_max_pdu: u32,
    own_max_pdu: u32,
    strict: bool,
    artim_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    buffer: Vec<u8>,
}

impl ClientAssociation {
    /// The current state of the association state machine.
    pub fn state(&self) -> State {
        self.state
    }

    /// The accepted presentation context negotiated for the given
    /// abstract syntax, if any.
    pub fn presentation_context_for(
        &self,
        abstract_syntax: &str,
    ) -> Option<&PresentationContextResult> {
        let id = self
            .abstract_syntaxes
            .iter()
            .find(|(_, uid)| uid == abstract_syntax)
            .map(|(id, _)| *id)?;
        self.presentation_contexts
            .iter()
            .find(|pc| pc.id == id && pc.is_accepted())
    }

    fn transition(&mut self, event: Event) -> Result<()> {
        match self.state.transition(event) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(e) => {
                // a protocol violation is answered with an abort
                let _ = self.send_abort_pdu();
                Err(e).context(ProtocolStateSnafu)
            }
        }
    }

    fn send_abort_pdu(&mut self) -> Result<()> {
        let pdu = Pdu::AbortRq {
            source: AbortSource::ServiceUser,
        };
        self.buffer.clear();
        write_pdu(&mut self.buffer, &pdu).context(SendPduSnafu)?;
        self.stream.write_all(&self.buffer).context(WireSendSnafu)?;
        self.state = State::Sta13;
        let _ = self.stream.shutdown(Shutdown::Both);
        Ok(())
    }

    fn receive_any(&mut self) -> Result<Pdu> {
        let limit = receive_limit(self.own_max_pdu);
        let pdu = read_pdu(&mut self.stream, limit, self.strict).context(ReceivePduSnafu)?;
        self.transition(event_for_received(&pdu))?;
        Ok(pdu)
    }

    /// Release the association gracefully and close the transport.
    pub fn release(mut self) -> Result<()> {
        self.send(&Pdu::ReleaseRq)?;
        // the ARTIM timer bounds the wait for the release response
        self.stream
            .set_read_timeout(self.artim_timeout)
            .context(SocketOptionSnafu)?;
        loop {
            match self.receive_any()? {
                Pdu::ReleaseRp => break,
                // late pending data may still arrive; it is discarded
                Pdu::PData { .. } => continue,
                Pdu::AbortRq { source } => {
                    return AbortedSnafu {
                        abort_source: source,
                    }
                    .fail();
                }
                pdu => {
                    let _ = self.send_abort_pdu();
                    return UnexpectedPduSnafu {
                        description: pdu.short_description(),
                    }
                    .fail();
                }
            }
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        self.state = State::Sta1;
        Ok(())
    }
}

impl Association for ClientAssociation {
    fn send(&mut self, pdu: &Pdu) -> Result<()> {
        self.transition(event_for_sent(pdu))?;
        self.buffer.clear();
        write_pdu(&mut self.buffer, pdu).context(SendPduSnafu)?;
        self.stream.write_all(&self.buffer).context(WireSendSnafu)
    }

    fn receive(&mut self) -> Result<Pdu> {
        self.receive_any()
    }

    fn presentation_contexts(&self) -> &[PresentationContextResult] {
        &self.presentation_contexts
    }

    fn max_pdu_send(&self) -> u32 {
        send_limit(self.peer_max_pdu)
    }

    fn abort(&mut self) -> Result<()> {
        self.send_abort_pdu()
    }

    fn send_pdata(&mut self, presentation_context_id: u8) -> PDataWriter<&mut TcpStream> {
        PDataWriter::new(
            &mut self.stream,
            presentation_context_id,
            PDataValueType::Data,
            send_limit(self.peer_max_pdu),
        )
    }
}

/// Extract the peer's advertised maximum PDU length,
/// defaulting when the sub-item is absent.
pub(crate) fn max_length_of(user_variables: &[UserVariableItem]) -> u32 {
    user_variables
        .iter()
        .find_map(|item| match item {
            UserVariableItem::MaxLength(value) => Some(*value),
            _ => None,
        })
        .unwrap_or(DEFAULT_MAX_PDU)
}
