use std::{sync::mpsc, thread};

use crate::common::{self, keygen::MockSuite, NAMES};
use broadcaster::Broadcaster;
use party::{ChannelTransport, Message};
use roundtable::{
    keygen::{KeyShare, KeygenPartyId},
    sdk::api::{PartyId, ProtocolError, SessionError},
};

/// Run `count` parties on their own threads; results come back in registry order.
fn run_keygen(
    count: usize,
    threshold: usize,
    suite: MockSuite,
) -> Vec<Result<KeyShare, SessionError>> {
    common::set_up_logs();
    let (broadcaster, receivers) = Broadcaster::<Message<KeygenPartyId>>::new(count);
    let parties = common::keygen::initialize_parties(count, threshold, suite, |_| {
        ChannelTransport::new(broadcaster.clone())
    });
    drop(broadcaster);

    let (result_sender, result_receiver) = mpsc::channel();
    for (i, ((session, result), receiver)) in parties.into_iter().zip(receivers).enumerate() {
        let result_sender = result_sender.clone();
        thread::spawn(move || {
            result_sender
                .send((i, party::execute_protocol(session, result, receiver)))
                .expect("result channel closed");
        });
    }

    drop(result_sender); // so that result_receiver can close

    let mut results: Vec<_> = result_receiver.into_iter().collect();
    assert_eq!(results.len(), count, "a party thread panicked");
    results.sort_by_key(|(i, _)| *i);
    results.into_iter().map(|(_, result)| result).collect()
}

#[test]
fn basic_correctness() {
    let (count, threshold) = (5, 2);
    let shares: Vec<KeyShare> = run_keygen(count, threshold, MockSuite::default())
        .into_iter()
        .map(|result| result.expect("party finished in sad path"))
        .collect();

    for (i, share) in shares.iter().enumerate() {
        assert_eq!(share.index().as_usize(), i);
        assert_eq!(share.group(), shares[0].group());
        assert_eq!(share.group().parties().as_slice()[i].id(), NAMES[i]);
    }
}

#[test]
fn honest_parties_agree_on_culprits() {
    let suite = MockSuite::default()
        .with_bad_prover("dave")
        .with_verifier_error("alice");
    let results = run_keygen(5, 2, suite);

    for (i, result) in results.into_iter().enumerate() {
        let report = result.unwrap_err();
        let culprits: Vec<&str> = report.error.culprits().iter().map(PartyId::id).collect();
        assert!(matches!(
            report.error,
            ProtocolError::VerificationFailed { round: 4, .. }
        ));
        match NAMES[i] {
            // nobody blames themselves
            "alice" => assert_eq!(culprits, vec!["dave"]),
            "dave" => assert_eq!(culprits, vec!["alice"]),
            _ => assert_eq!(culprits, vec!["alice", "dave"]),
        }
    }
}

mod broadcaster {
    use std::sync::mpsc::{self, Receiver, SendError, Sender};

    #[derive(Clone)]
    pub struct Broadcaster<T> {
        senders: Vec<Sender<T>>,
    }

    impl<T> Broadcaster<T>
    where
        T: Clone,
    {
        pub fn new(party_count: usize) -> (Self, Vec<Receiver<T>>) {
            let (senders, receivers) = (0..party_count).map(|_| mpsc::channel()).unzip();
            (Self { senders }, receivers)
        }

        /// Parties that already finished have dropped their receiver; skip them.
        pub fn send(&self, msg: T) {
            for sender in self.senders.iter() {
                let _ = sender.send(msg.clone());
            }
        }

        pub fn send_to(&self, index: usize, msg: T) -> Result<(), String> {
            self.senders
                .get(index)
                .ok_or_else(|| format!("no party at index {}", index))?
                .send(msg)
                .map_err(|SendError(_)| format!("party {} hung up", index))
        }
    }
}

mod party;
