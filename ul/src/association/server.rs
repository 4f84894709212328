//! Association acceptor module.
//!
//! [`ServerAssociationOptions`] negotiates an incoming association
//! request on an accepted TCP connection,
//! applying access control and presentation context negotiation,
//! and yields a [`ServerAssociation`] in data-transfer state.
//! Unlike the client options, one value can serve many connections.

use crate::association::pdata::PDataWriter;
use crate::association::{
    event_for_received, event_for_sent, receive_limit, send_limit, AbortedSnafu, Association,
    NoAcceptedPresentationContextsSnafu, ProtocolStateSnafu, ReceivePduSnafu, RejectedSnafu,
    Result, SendPduSnafu, SocketOptionSnafu, UnexpectedPduSnafu, WireSendSnafu,
};
use crate::pdu::reader::read_pdu;
use crate::pdu::writer::write_pdu;
use crate::pdu::{
    AbortServiceProviderReason, AbortSource, AssociationRjResult, AssociationRjSource, Pdu,
    PDataValueType, PresentationContextProposed, PresentationContextResult,
    PresentationContextResultReason, ServiceUserReason, UserVariableItem, DEFAULT_MAX_PDU,
};
use crate::state::{Event, State};
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};
use pacs_transfer_syntax_registry::{trim_uid, TransferSyntaxRegistry};
use snafu::ResultExt;
use std::borrow::Cow;
use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// The application entity access control policy applied
/// while processing an association request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessControl {
    /// Accept requests from any node.
    AcceptAny,
    /// Accept requests whose called AE title matches this node's title.
    AcceptCalledAeTitle,
    /// Accept requests whose calling AE title is on the list.
    AllowCallingAeTitles(Vec<String>),
}

impl AccessControl {
    /// Decide whether to give the requesting node clearance,
    /// or under which service-user reason to turn it down.
    pub fn check_access(
        &self,
        this_ae_title: &str,
        calling_ae_title: &str,
        called_ae_title: &str,
    ) -> std::result::Result<(), ServiceUserReason> {
        match self {
            AccessControl::AcceptAny => Ok(()),
            AccessControl::AcceptCalledAeTitle => {
                if this_ae_title == called_ae_title {
                    Ok(())
                } else {
                    Err(ServiceUserReason::CalledAeTitleNotRecognized)
                }
            }
            AccessControl::AllowCallingAeTitles(allowed) => {
                if allowed.iter().any(|ae| ae == calling_ae_title) {
                    Ok(())
                } else {
                    Err(ServiceUserReason::CallingAeTitleNotRecognized)
                }
            }
        }
    }
}

/// A builder for accepting and negotiating incoming associations,
/// usually taking the role of a service class provider.
///
/// The acceptor answers each proposed presentation context with
/// at most one of the transfer syntaxes it supports,
/// or a per-context rejection reason;
/// rejected contexts survive the association as "not accepted".
#[derive(Debug, Clone)]
pub struct ServerAssociationOptions<'a> {
    ae_title: Cow<'a, str>,
    ae_access_control: AccessControl,
    application_context_name: Cow<'a, str>,
    abstract_syntax_uids: Vec<String>,
    transfer_syntax_uids: Vec<String>,
    protocol_version: u16,
    max_pdu_length: u32,
    strict: bool,
    promiscuous: bool,
    artim_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl Default for ServerAssociationOptions<'_> {
    fn default() -> Self {
        ServerAssociationOptions {
            ae_title: "THIS-SCP".into(),
            ae_access_control: AccessControl::AcceptAny,
            application_context_name: "1.2.840.10008.3.1.1.1".into(),
            abstract_syntax_uids: Vec::new(),
            transfer_syntax_uids: Vec::new(),
            protocol_version: 1,
            max_pdu_length: DEFAULT_MAX_PDU,
            strict: true,
            promiscuous: false,
            artim_timeout: Some(Duration::from_secs(30)),
            read_timeout: None,
        }
    }
}

impl<'a> ServerAssociationOptions<'a> {
    /// Create a new set of options for accepting associations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the application entity title of this node.
    pub fn ae_title<T>(mut self, title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.ae_title = title.into();
        self
    }

    /// Change the access control policy.
    /// The default accepts any requesting node.
    pub fn ae_access_control(mut self, access_control: AccessControl) -> Self {
        self.ae_access_control = access_control;
        self
    }

    /// Include this abstract syntax in the set of services
    /// this node is willing to negotiate.
    pub fn with_abstract_syntax<T>(mut self, abstract_syntax_uid: T) -> Self
    where
        T: Into<String>,
    {
        let uid = abstract_syntax_uid.into();
        self.abstract_syntax_uids
            .push(trim_uid(&uid).to_string());
        self
    }

    /// Include this transfer syntax in the menu offered
    /// for every negotiated presentation context.
    /// When none is given, every registered transfer syntax
    /// is acceptable.
    pub fn with_transfer_syntax<T>(mut self, transfer_syntax_uid: T) -> Self
    where
        T: Into<String>,
    {
        let uid = transfer_syntax_uid.into();
        self.transfer_syntax_uids
            .push(trim_uid(&uid).to_string());
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

    /// Override promiscuous mode: whether unknown abstract syntaxes
    /// are accepted anyway.
    pub fn promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    /// Set the ARTIM timer applied while awaiting the association
    /// request and during release.
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

    /// Process an association request on the given connection.
    pub fn establish(&self, stream: TcpStream) -> Result<ServerAssociation> {
        let state = State::Sta1
            .transition(Event::TransportConnect)
            .context(ProtocolStateSnafu)?;

        stream
            .set_read_timeout(self.artim_timeout)
            .context(SocketOptionSnafu)?;

        let mut association = ServerAssociation {
            stream,
            state,
            client_ae_title: String::new(),
            presentation_contexts: Vec::new(),
            abstract_syntaxes: Vec::new(),
            peer_max_pdu: DEFAULT_MAX_PDU,
            own_max_pdu: self.max_pdu_length,
            strict: self.strict,
            read_timeout: self.read_timeout,
            artim_timeout: self.artim_timeout,
            buffer: Vec::with_capacity(DEFAULT_MAX_PDU as usize),
        };

        let request = association.receive_any()?;

        let (calling_ae_title, called_ae_title, presentation_contexts, user_variables) =
            match request {
                Pdu::AssociationRq {
                    protocol_version,
                    calling_ae_title,
                    called_ae_title,
                    application_context_name,
                    presentation_contexts,
                    user_variables,
                } => {
                    if protocol_version != self.protocol_version {
                        return association.reject(AssociationRjSource::ServiceUser(
                            ServiceUserReason::NoReasonGiven,
                        ));
                    }
                    if application_context_name != self.application_context_name {
                        return association.reject(AssociationRjSource::ServiceUser(
                            ServiceUserReason::ApplicationContextNameNotSupported,
                        ));
                    }
                    (
                        calling_ae_title,
                        called_ae_title,
                        presentation_contexts,
                        user_variables,
                    )
                }
                Pdu::AbortRq { source } => {
                    return AbortedSnafu {
                        abort_source: source,
                    }
                    .fail();
                }
                pdu => {
                    let _ = association.abort_with(AbortSource::ServiceProvider(
                        AbortServiceProviderReason::UnexpectedPdu,
                    ));
                    return UnexpectedPduSnafu {
                        description: pdu.short_description(),
                    }
                    .fail();
                }
            };
        debug_assert_eq!(association.state, State::Sta3);

        if let Err(reason) =
            self.ae_access_control
                .check_access(&self.ae_title, &calling_ae_title, &called_ae_title)
        {
            tracing::info!(
                calling = %calling_ae_title,
                called = %called_ae_title,
                ?reason,
                "association request denied"
            );
            return association.reject(AssociationRjSource::ServiceUser(reason));
        }

        let results: Vec<PresentationContextResult> = presentation_contexts
            .iter()
            .map(|pc| self.negotiate_context(pc))
            .collect();

        if !results.iter().any(PresentationContextResult::is_accepted) {
            let _ = association.send_reject_pdu(AssociationRjSource::ServiceUser(
                ServiceUserReason::NoReasonGiven,
            ));
            return NoAcceptedPresentationContextsSnafu.fail();
        }

        let ac = Pdu::AssociationAc {
            protocol_version: self.protocol_version,
            calling_ae_title: calling_ae_title.clone(),
            called_ae_title,
            application_context_name: self.application_context_name.to_string(),
            presentation_contexts: results.clone(),
            user_variables: vec![
                UserVariableItem::MaxLength(self.max_pdu_length),
                UserVariableItem::ImplementationClassUid(IMPLEMENTATION_CLASS_UID.to_string()),
                UserVariableItem::ImplementationVersionName(
                    IMPLEMENTATION_VERSION_NAME.to_string(),
                ),
            ],
        };
        association.send(&ac)?;

        association.client_ae_title = calling_ae_title;
        association.presentation_contexts = results;
        association.abstract_syntaxes = presentation_contexts
            .iter()
            .map(|pc| (pc.id, trim_uid(&pc.abstract_syntax).to_string()))
            .collect();
        association.peer_max_pdu = super::client::max_length_of(&user_variables);
        association
            .stream
            .set_read_timeout(association.read_timeout)
            .context(SocketOptionSnafu)?;

        Ok(association)
    }

    /// Negotiate one proposed presentation context.
    fn negotiate_context(
        &self,
        proposed: &PresentationContextProposed,
    ) -> PresentationContextResult {
        let fallback_ts = || {
            proposed
                .transfer_syntaxes
                .first()
                .cloned()
                .unwrap_or_else(|| "1.2.840.10008.1.2".to_string())
        };

        let abstract_known = self
            .abstract_syntax_uids
            .iter()
            .any(|uid| uid == trim_uid(&proposed.abstract_syntax));
        if !abstract_known && !self.promiscuous {
            return PresentationContextResult {
                id: proposed.id,
                reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                transfer_syntax: fallback_ts(),
            };
        }

        let chosen = proposed.transfer_syntaxes.iter().find(|ts| {
            let ts = trim_uid(ts);
            let registered = TransferSyntaxRegistry.contains(ts);
            let in_menu = self.transfer_syntax_uids.is_empty()
                || self.transfer_syntax_uids.iter().any(|t| t == ts);
            registered && in_menu
        });

        match chosen {
            Some(ts) => PresentationContextResult {
                id: proposed.id,
                reason: PresentationContextResultReason::Acceptance,
                transfer_syntax: trim_uid(ts).to_string(),
            },
            None => PresentationContextResult {
                id: proposed.id,
                reason: PresentationContextResultReason::TransferSyntaxesNotSupported,
                transfer_syntax: fallback_ts(),
            },
        }
    }
}

/// An established association, from the acceptor side.
#[derive(Debug)]
pub struct ServerAssociation {
    stream: TcpStream,
    state: State,
    client_ae_title: String,
    presentation_contexts: Vec<PresentationContextResult>,
    /// proposed abstract syntax of each context, by context id
    abstract_syntaxes: Vec<(u8, String)>,
    peer_max_pdu: u32,
    own_max_pdu: u32,
    strict: bool,
    read_timeout: Option<Duration>,
    artim_timeout: Option<Duration>,
    buffer: Vec<u8>,
}

impl ServerAssociation {
    /// The AE title of the requesting node.
    pub fn client_ae_title(&self) -> &str {
        &self.client_ae_title
    }

    /// The current state of the association state machine.
    pub fn state(&self) -> State {
        self.state
    }

    /// The accepted transfer syntax of the given presentation context,
    /// if that context was accepted.
    pub fn transfer_syntax_of(&self, presentation_context_id: u8) -> Option<&str> {
        self.presentation_contexts
            .iter()
            .find(|pc| pc.id == presentation_context_id && pc.is_accepted())
            .map(|pc| pc.transfer_syntax.as_str())
    }

    /// The abstract syntax the requestor proposed on the given
    /// presentation context.
    pub fn abstract_syntax_of(&self, presentation_context_id: u8) -> Option<&str> {
        self.abstract_syntaxes
            .iter()
            .find(|(id, _)| *id == presentation_context_id)
            .map(|(_, uid)| uid.as_str())
    }

    /// Attempt to receive a PDU, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    /// Service handlers use this to poll for C-CANCEL requests
    /// between response emissions.
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Option<Pdu>> {
        self.stream
            .set_read_timeout(Some(timeout))
            .context(SocketOptionSnafu)?;
        let limit = receive_limit(self.own_max_pdu);
        let outcome = read_pdu(&mut self.stream, limit, self.strict);
        self.stream
            .set_read_timeout(self.read_timeout)
            .context(SocketOptionSnafu)?;
        match outcome {
            Ok(pdu) => {
                self.transition(event_for_received(&pdu))?;
                Ok(Some(pdu))
            }
            Err(crate::pdu::reader::Error::ReadPduField { ref source, .. })
                if source.kind() == std::io::ErrorKind::WouldBlock
                    || source.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e).context(ReceivePduSnafu),
        }
    }

    fn transition(&mut self, event: Event) -> Result<()> {
        match self.state.transition(event) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(e) => {
                let _ = self.abort_with(AbortSource::ServiceProvider(
                    AbortServiceProviderReason::UnexpectedPdu,
                ));
                Err(e).context(ProtocolStateSnafu)
            }
        }
    }

    fn receive_any(&mut self) -> Result<Pdu> {
        let limit = receive_limit(self.own_max_pdu);
        let pdu = read_pdu(&mut self.stream, limit, self.strict).context(ReceivePduSnafu)?;
        self.transition(event_for_received(&pdu))?;
        Ok(pdu)
    }

    /// Send an A-ASSOCIATE-RJ and close the transport.
    fn send_reject_pdu(&mut self, source: AssociationRjSource) -> Result<()> {
        let pdu = Pdu::AssociationRj {
            result: AssociationRjResult::Permanent,
            source,
        };
        self.buffer.clear();
        write_pdu(&mut self.buffer, &pdu).context(SendPduSnafu)?;
        self.stream.write_all(&self.buffer).context(WireSendSnafu)?;
        self.state = State::Sta13;
        let _ = self.stream.shutdown(Shutdown::Both);
        Ok(())
    }

    /// Send an A-ASSOCIATE-RJ, close the transport and
    /// report the rejection as an error.
    fn reject(mut self, source: AssociationRjSource) -> Result<ServerAssociation> {
        self.send_reject_pdu(source)?;
        RejectedSnafu {
            result: AssociationRjResult::Permanent,
            reject_source: source,
        }
        .fail()
    }

    fn abort_with(&mut self, source: AbortSource) -> Result<()> {
        let pdu = Pdu::AbortRq { source };
        self.buffer.clear();
        write_pdu(&mut self.buffer, &pdu).context(SendPduSnafu)?;
        self.stream.write_all(&self.buffer).context(WireSendSnafu)?;
        self.state = State::Sta13;
        let _ = self.stream.shutdown(Shutdown::Both);
        Ok(())
    }

    /// Answer a received A-RELEASE-RQ, close the transport
    /// and consume the association.
    pub fn confirm_release(mut self) -> Result<()> {
        self.stream
            .set_read_timeout(self.artim_timeout)
            .context(SocketOptionSnafu)?;
        self.transition(Event::SendReleaseRp)?;
        self.buffer.clear();
        write_pdu(&mut self.buffer, &Pdu::ReleaseRp).context(SendPduSnafu)?;
        self.stream.write_all(&self.buffer).context(WireSendSnafu)?;
        let _ = self.stream.shutdown(Shutdown::Both);
        Ok(())
    }
}

impl Association for ServerAssociation {
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
        self.abort_with(AbortSource::ServiceUser)
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

#[cfg(test)]
mod tests {
    use super::{AccessControl, ServerAssociationOptions};
    use crate::pdu::{PresentationContextProposed, PresentationContextResultReason};

    #[test]
    fn allow_list_checks_calling_ae() {
        let policy = AccessControl::AllowCallingAeTitles(vec!["GOOD_SCU".to_string()]);
        assert!(policy.check_access("MAIN-PACS", "GOOD_SCU", "MAIN-PACS").is_ok());
        assert!(policy.check_access("MAIN-PACS", "BAD_SCU", "MAIN-PACS").is_err());
    }

    #[test]
    fn context_negotiation_picks_first_supported() {
        let options = ServerAssociationOptions::new()
            .with_abstract_syntax("1.2.840.10008.1.1")
            .with_transfer_syntax("1.2.840.10008.1.2.1")
            .with_transfer_syntax("1.2.840.10008.1.2");
        let result = options.negotiate_context(&PresentationContextProposed {
            id: 1,
            abstract_syntax: "1.2.840.10008.1.1".to_string(),
            transfer_syntaxes: vec![
                "1.2.840.10008.1.2.4.999".to_string(),
                "1.2.840.10008.1.2.1".to_string(),
            ],
        });
        assert_eq!(result.reason, PresentationContextResultReason::Acceptance);
        assert_eq!(result.transfer_syntax, "1.2.840.10008.1.2.1");
    }

    #[test]
    fn unknown_abstract_syntax_is_rejected() {
        let options = ServerAssociationOptions::new().with_abstract_syntax("1.2.840.10008.1.1");
        let result = options.negotiate_context(&PresentationContextProposed {
            id: 3,
            abstract_syntax: "1.2.840.10008.5.1.4.1.1.2".to_string(),
            transfer_syntaxes: vec!["1.2.840.10008.1.2".to_string()],
        });
        assert_eq!(
            result.reason,
            PresentationContextResultReason::AbstractSyntaxNotSupported
        );
    }

    #[test]
    fn unknown_transfer_syntaxes_are_rejected() {
        let options = ServerAssociationOptions::new().with_abstract_syntax("1.2.840.10008.1.1");
        let result = options.negotiate_context(&PresentationContextProposed {
            id: 5,
            abstract_syntax: "1.2.840.10008.1.1".to_string(),
            transfer_syntaxes: vec!["1.2.840.10008.1.2.4.999".to_string()],
        });
        assert_eq!(
            result.reason,
            PresentationContextResultReason::TransferSyntaxesNotSupported
        );
    }
}
