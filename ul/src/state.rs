//! The association state machine of PS3.8 Table 9-8,
//! at the granularity this suite drives it.
//!
//! Both association halves consult the same transition table,
//! so an out-of-order PDU is detected in exactly one place.
//! An invalid transition is answered by the caller with A-ABORT
//! and a move to [`State::Sta13`].

use snafu::{Backtrace, Snafu};

/// The states of an association, named after PS3.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// idle, no transport connection
    Sta1,
    /// transport connection open, awaiting A-ASSOCIATE-RQ (acceptor)
    Sta2,
    /// awaiting the local accept/reject decision (acceptor)
    Sta3,
    /// awaiting A-ASSOCIATE-AC or -RJ (requestor)
    Sta4,
    /// association established, data transfer ready
    Sta6,
    /// release requested, awaiting A-RELEASE-RP (initiator)
    Sta7,
    /// release received, awaiting the local release response (collaborator)
    Sta8,
    /// association aborted or rejected, awaiting transport close
    Sta13,
}

/// The events which drive the association state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// transport connection accepted (acceptor side)
    TransportConnect,
    /// A-ASSOCIATE request primitive issued, RQ sent (requestor side)
    SendAssociateRq,
    /// A-ASSOCIATE-RQ PDU received
    ReceiveAssociateRq,
    /// local user accepted, A-ASSOCIATE-AC sent
    SendAssociateAc,
    /// local user rejected, A-ASSOCIATE-RJ sent
    SendAssociateRj,
    /// A-ASSOCIATE-AC PDU received
    ReceiveAssociateAc,
    /// A-ASSOCIATE-RJ PDU received
    ReceiveAssociateRj,
    /// P-DATA-TF sent
    SendPData,
    /// P-DATA-TF received
    ReceivePData,
    /// A-RELEASE-RQ sent
    SendReleaseRq,
    /// A-RELEASE-RQ received
    ReceiveReleaseRq,
    /// A-RELEASE-RP sent
    SendReleaseRp,
    /// A-RELEASE-RP received
    ReceiveReleaseRp,
    /// A-ABORT sent
    SendAbort,
    /// A-ABORT received
    ReceiveAbort,
    /// the transport connection closed or broke
    TransportClosed,
    /// the ARTIM timer expired
    ArtimExpired,
}

/// An invalid state/event combination.
#[derive(Debug, Snafu)]
#[snafu(display("event {:?} is not allowed in state {:?}", event, state))]
pub struct InvalidTransition {
    pub state: State,
    pub event: Event,
    backtrace: Backtrace,
}

impl State {
    /// Apply an event, yielding the next state
    /// or an invalid-transition error.
    pub fn transition(self, event: Event) -> Result<State, InvalidTransition> {
        use Event::*;
        use State::*;

        // aborts and transport failures dominate every state
        match event {
            SendAbort | ReceiveAbort | ArtimExpired => return Ok(Sta13),
            TransportClosed => {
                return Ok(if self == Sta13 || self == Sta7 { Sta1 } else { Sta13 })
            }
            _ => {}
        }

        match (self, event) {
            // acceptor establishment
            (Sta1, TransportConnect) => Ok(Sta2),
            (Sta2, ReceiveAssociateRq) => Ok(Sta3),
            (Sta3, SendAssociateAc) => Ok(Sta6),
            (Sta3, SendAssociateRj) => Ok(Sta13),

            // requestor establishment
            (Sta1, SendAssociateRq) => Ok(Sta4),
            (Sta4, ReceiveAssociateAc) => Ok(Sta6),
            (Sta4, ReceiveAssociateRj) => Ok(Sta13),

            // data transfer; pending data may still arrive
            // after a release request went out
            (Sta6, SendPData) | (Sta6, ReceivePData) => Ok(Sta6),
            (Sta7, ReceivePData) => Ok(Sta7),

            // orderly release
            (Sta6, SendReleaseRq) => Ok(Sta7),
            (Sta6, ReceiveReleaseRq) => Ok(Sta8),
            (Sta7, ReceiveReleaseRp) => Ok(Sta1),
            (Sta8, SendReleaseRp) => Ok(Sta1),

            (state, event) => InvalidTransitionSnafu { state, event }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, State};

    #[test]
    fn requestor_happy_path() {
        let s = State::Sta1;
        let s = s.transition(Event::SendAssociateRq).unwrap();
        assert_eq!(s, State::Sta4);
        let s = s.transition(Event::ReceiveAssociateAc).unwrap();
        assert_eq!(s, State::Sta6);
        let s = s.transition(Event::SendPData).unwrap();
        let s = s.transition(Event::ReceivePData).unwrap();
        let s = s.transition(Event::SendReleaseRq).unwrap();
        assert_eq!(s, State::Sta7);
        let s = s.transition(Event::ReceiveReleaseRp).unwrap();
        assert_eq!(s, State::Sta1);
    }

    #[test]
    fn acceptor_happy_path() {
        let s = State::Sta1;
        let s = s.transition(Event::TransportConnect).unwrap();
        assert_eq!(s, State::Sta2);
        let s = s.transition(Event::ReceiveAssociateRq).unwrap();
        assert_eq!(s, State::Sta3);
        let s = s.transition(Event::SendAssociateAc).unwrap();
        assert_eq!(s, State::Sta6);
        let s = s.transition(Event::ReceiveReleaseRq).unwrap();
        assert_eq!(s, State::Sta8);
        let s = s.transition(Event::SendReleaseRp).unwrap();
        assert_eq!(s, State::Sta1);
    }

    #[test]
    fn rejection_paths_end_in_sta13() {
        let s = State::Sta3.transition(Event::SendAssociateRj).unwrap();
        assert_eq!(s, State::Sta13);
        let s = State::Sta4.transition(Event::ReceiveAssociateRj).unwrap();
        assert_eq!(s, State::Sta13);
        let s = s.transition(Event::TransportClosed).unwrap();
        assert_eq!(s, State::Sta1);
    }

    #[test]
    fn abort_dominates_any_state() {
        for &state in &[State::Sta2, State::Sta4, State::Sta6, State::Sta7] {
            assert_eq!(state.transition(Event::ReceiveAbort).unwrap(), State::Sta13);
            assert_eq!(state.transition(Event::ArtimExpired).unwrap(), State::Sta13);
        }
    }

    #[test]
    fn data_before_establishment_is_invalid() {
        assert!(State::Sta4.transition(Event::SendPData).is_err());
        assert!(State::Sta2.transition(Event::ReceivePData).is_err());
        assert!(State::Sta1.transition(Event::SendReleaseRq).is_err());
    }
}
