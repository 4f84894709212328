//! Association establishment and use,
//! on the requesting ([`client`]) and accepting ([`server`]) sides.

pub mod client;
pub mod pdata;
pub mod server;

use crate::pdu::{
    AbortSource, AssociationRjResult, AssociationRjSource, Pdu, PresentationContextResult,
    MAXIMUM_PDU_SIZE,
};
use crate::state::Event;
use snafu::{Backtrace, Snafu};
use std::net::TcpStream;

pub use self::pdata::PDataWriter;

/// The possible failures when negotiating and using an association.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not connect to `{}`", address))]
    Connect {
        address: String,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not set socket option"))]
    SocketOption {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not serialize PDU"))]
    SendPdu {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    #[snafu(display("could not send PDU bytes"))]
    WireSend {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not receive PDU"))]
    ReceivePdu {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    /// The peer rejected the association request.
    #[snafu(display("association rejected ({:?}): {:?}", result, reject_source))]
    Rejected {
        result: AssociationRjResult,
        reject_source: AssociationRjSource,
        backtrace: Backtrace,
    },

    /// The peer aborted the association.
    #[snafu(display("association aborted by {:?}", abort_source))]
    Aborted {
        abort_source: AbortSource,
        backtrace: Backtrace,
    },

    #[snafu(display("unexpected {} PDU", description))]
    UnexpectedPdu {
        description: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("protocol state violation"))]
    ProtocolState {
        #[snafu(backtrace)]
        source: crate::state::InvalidTransition,
    },

    /// The acceptor turned down every proposed presentation context.
    #[snafu(display("no presentation context was accepted"))]
    NoAcceptedPresentationContexts { backtrace: Backtrace },

    /// An association request needs at least one abstract syntax.
    #[snafu(display("at least one abstract syntax is required"))]
    MissingAbstractSyntax { backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Common surface of the two association halves,
/// which the DIMSE layer builds messages on.
pub trait Association {
    /// Send a PDU over the association.
    fn send(&mut self, pdu: &Pdu) -> Result<()>;

    /// Receive the next PDU from the peer.
    ///
    /// Release requests and aborts are returned like any other PDU,
    /// with the state machine already advanced,
    /// so service loops can react to them.
    fn receive(&mut self) -> Result<Pdu>;

    /// The accepted presentation contexts of this association.
    fn presentation_contexts(&self) -> &[PresentationContextResult];

    /// The maximum PDU size the peer is willing to receive.
    fn max_pdu_send(&self) -> u32;

    /// Issue an A-ABORT and close the transport.
    fn abort(&mut self) -> Result<()>;

    /// Open a P-DATA writer which splits written bytes
    /// into PDUs bounded by the peer's maximum PDU size.
    fn send_pdata(&mut self, presentation_context_id: u8) -> PDataWriter<&mut TcpStream>;
}

/// The PDU size limit to apply to sends,
/// given the peer's advertised maximum (zero meaning unlimited).
pub(crate) fn send_limit(peer_max: u32) -> u32 {
    if peer_max == 0 {
        MAXIMUM_PDU_SIZE
    } else {
        peer_max.min(MAXIMUM_PDU_SIZE)
    }
}

/// The PDU size limit to apply to receives,
/// given our advertised maximum (zero meaning unlimited).
pub(crate) fn receive_limit(our_max: u32) -> u32 {
    if our_max == 0 {
        MAXIMUM_PDU_SIZE
    } else {
        our_max.min(MAXIMUM_PDU_SIZE)
    }
}

/// The state machine event corresponding to receiving this PDU.
pub(crate) fn event_for_received(pdu: &Pdu) -> Event {
    match pdu {
        Pdu::AssociationRq { .. } => Event::ReceiveAssociateRq,
        Pdu::AssociationAc { .. } => Event::ReceiveAssociateAc,
        Pdu::AssociationRj { .. } => Event::ReceiveAssociateRj,
        Pdu::PData { .. } => Event::ReceivePData,
        Pdu::ReleaseRq => Event::ReceiveReleaseRq,
        Pdu::ReleaseRp => Event::ReceiveReleaseRp,
        Pdu::AbortRq { .. } => Event::ReceiveAbort,
        Pdu::Unknown { .. } => Event::ReceiveAbort,
    }
}

/// The state machine event corresponding to sending this PDU.
pub(crate) fn event_for_sent(pdu: &Pdu) -> Event {
    match pdu {
        Pdu::AssociationRq { .. } => Event::SendAssociateRq,
        Pdu::AssociationAc { .. } => Event::SendAssociateAc,
        Pdu::AssociationRj { .. } => Event::SendAssociateRj,
        Pdu::PData { .. } => Event::SendPData,
        Pdu::ReleaseRq => Event::SendReleaseRq,
        Pdu::ReleaseRp => Event::SendReleaseRp,
        Pdu::AbortRq { .. } => Event::SendAbort,
        Pdu::Unknown { .. } => Event::SendAbort,
    }
}

#[cfg(test)]
mod tests {
    use super::{receive_limit, send_limit};
    use crate::pdu::MAXIMUM_PDU_SIZE;

    #[test]
    fn zero_advertised_limit_means_unlimited() {
        assert_eq!(send_limit(0), MAXIMUM_PDU_SIZE);
        assert_eq!(send_limit(16384), 16384);
        assert_eq!(receive_limit(0), MAXIMUM_PDU_SIZE);
    }
}
