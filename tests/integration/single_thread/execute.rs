//! Single-threaded generic protocol execution

use roundtable::{
    collections::TypedUsize,
    sdk::api::{ProtocolMessage, ProtocolResult, Round, RoundOrchestrator, SessionStatus, Transport},
};
use tracing::warn;

/// Collects outgoing messages until the executor picks them up.
pub struct QueueTransport<P, M> {
    outgoing: Vec<ProtocolMessage<P, M>>,
}

impl<P, M> Default for QueueTransport<P, M> {
    fn default() -> Self {
        Self {
            outgoing: Vec::new(),
        }
    }
}

impl<P, M: Clone> Transport<P, M> for QueueTransport<P, M> {
    fn broadcast(&mut self, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()> {
        self.outgoing.push(msg.clone());
        Ok(())
    }
    fn send_to(&mut self, _to: TypedUsize<P>, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()> {
        // `msg.to` already names the recipient
        self.outgoing.push(msg.clone());
        Ok(())
    }
}

pub type QueuedSession<R> = RoundOrchestrator<R, QueueTransport<<R as Round>::Index, <R as Round>::Message>>;

/// Start every party, then deliver all in-flight messages in sender order,
/// one wave at a time, until nobody has anything left to say.
///
/// `tamper` sees every message before delivery. Errors from individual parties
/// end up in their `SessionResult`, so they are not propagated here.
pub fn execute_protocol<R>(
    parties: &mut [QueuedSession<R>],
    mut tamper: impl FnMut(&mut ProtocolMessage<R::Index, R::Message>),
) -> usize
where
    R: Round,
    R::Message: Clone,
{
    for party in parties.iter_mut() {
        let _ = party.start();
    }
    let mut waves = 0;
    loop {
        let in_flight: Vec<_> = parties
            .iter_mut()
            .flat_map(|party| std::mem::take(&mut party.transport_mut().outgoing))
            .collect();
        if in_flight.is_empty() {
            break;
        }
        waves += 1;
        for mut msg in in_flight {
            tamper(&mut msg);
            for (i, party) in parties.iter_mut().enumerate() {
                if i != msg.from.as_usize() {
                    let _ = party.deliver(msg.clone());
                }
            }
        }
    }
    warn_on_disagreement(parties);
    waves
}

fn warn_on_disagreement<R: Round, T>(parties: &[RoundOrchestrator<R, T>])
where
    T: Transport<R::Index, R::Message>,
{
    let (mut done, mut not_done) = (Vec::new(), Vec::new());
    for (i, party) in parties.iter().enumerate() {
        if party.status() == SessionStatus::Done {
            done.push(i);
        } else {
            not_done.push(i);
        }
    }
    if !done.is_empty() && !not_done.is_empty() {
        warn!(
            "disagreement: done parties {:?}, not done parties {:?}",
            done, not_done
        );
    }
}
