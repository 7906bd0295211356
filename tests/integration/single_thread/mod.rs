use std::time::Duration;

use crate::common::{self, keygen::MockSuite, NAMES};
use execute::*;
use roundtable::{
    keygen::{KeyShare, KeygenPayload, KeygenRound},
    sdk::api::{
        decode, encode, PartyId, ProtocolError, SessionError, SessionResult, SessionStatus,
    },
};
use serde::Serialize;

mod execute;

fn initialize(
    count: usize,
    threshold: usize,
    suite: MockSuite,
) -> (Vec<QueuedSession<KeygenRound>>, Vec<SessionResult<KeyShare>>) {
    common::set_up_logs();
    common::keygen::initialize_parties(count, threshold, suite, |_| QueueTransport::default())
        .into_iter()
        .unzip()
}

fn culprit_ids(report: &SessionError) -> Vec<&str> {
    report.error.culprits().iter().map(PartyId::id).collect()
}

#[test]
fn basic_correctness() {
    let (count, threshold) = (7, 4);
    let (mut parties, results) = initialize(count, threshold, MockSuite::default());

    // one wave of messages for each of rounds 1 to 3
    assert_eq!(execute_protocol(&mut parties, |_| {}), 3);

    let shares: Vec<KeyShare> = results
        .into_iter()
        .map(|result| result.wait().expect("party finished in sad path"))
        .collect();

    let group = shares[0].group();
    let ids: Vec<&str> = group.parties().iter().map(|(_, p)| p.id()).collect();
    assert_eq!(ids, NAMES[..count].to_vec());
    for (i, share) in shares.iter().enumerate() {
        assert_eq!(share.index().as_usize(), i);
        assert_eq!(share.group(), group);
        assert_eq!(parties[i].status(), SessionStatus::Done);
    }
    assert_eq!(group.threshold(), threshold);
    assert_eq!(group.all_parties().len(), count);
}

#[test]
fn culprits_in_registry_order() {
    // frank's proofs take longest to check and fail with an error; erin's are checked first
    let suite = MockSuite::default()
        .with_bad_prover("erin")
        .with_bad_prover("bob")
        .with_verifier_error("frank")
        .with_verify_delay("frank", Duration::from_millis(60))
        .with_verify_delay("bob", Duration::from_millis(30));
    let (mut parties, results) = initialize(7, 3, suite);
    execute_protocol(&mut parties, |_| {});

    let reports: Vec<(usize, SessionError)> = results
        .into_iter()
        .enumerate()
        .filter(|(i, _)| ![1, 4, 5].contains(i))
        .map(|(i, result)| (i, result.wait().unwrap_err()))
        .collect();
    assert_eq!(reports.len(), 4);
    for (i, report) in &reports {
        assert_eq!(report.round, 4);
        assert_eq!(report.task, "integration-keygen");
        assert_eq!(report.victim.id(), NAMES[*i]);
        assert!(matches!(
            report.error,
            ProtocolError::VerificationFailed { round: 4, .. }
        ));
        assert_eq!(culprit_ids(report), vec!["bob", "erin", "frank"]);
    }
}

#[test]
fn mismatched_reveal() {
    let (mut parties, results) = initialize(4, 2, MockSuite::default());
    // dave replays carol's reveal, which cannot open dave's commitment
    let mut carols_reveal = None;
    execute_protocol(&mut parties, |msg| {
        if let KeygenPayload::R2(_) = msg.payload {
            match msg.from.as_usize() {
                2 => carols_reveal = Some(msg.payload.clone()),
                3 => msg.payload = carols_reveal.clone().expect("senders are delivered in order"),
                _ => (),
            }
        }
    });

    for (i, result) in results.into_iter().enumerate().take(3) {
        let report = result.wait().unwrap_err();
        assert_eq!(report.victim.id(), NAMES[i]);
        assert!(matches!(
            report.error,
            ProtocolError::VerificationFailed { round: 3, .. }
        ));
        assert_eq!(culprit_ids(&report), vec!["dave"]);
    }
}

/// Same wire layout as a round-1 keygen broadcast.
#[derive(Serialize)]
enum ForgedPayload {
    R1 {
        commit: [u8; 32],
        public_params: Vec<u8>,
    },
}

fn forged_round1_without_params() -> KeygenPayload {
    let forged = ForgedPayload::R1 {
        commit: [7; 32],
        public_params: Vec::new(),
    };
    decode(&encode(&forged).unwrap()).expect("forged payload must decode")
}

#[test]
fn malformed_party_stalls_alone() {
    let (mut parties, mut results) = initialize(3, 1, MockSuite::default());
    execute_protocol(&mut parties, |msg| {
        if matches!(msg.payload, KeygenPayload::R1(_)) && msg.from.as_usize() == 2 {
            msg.payload = forged_round1_without_params();
        }
    });

    for result in results.iter_mut().take(2) {
        let report = result.try_take().unwrap().unwrap_err();
        assert!(matches!(
            report.error,
            ProtocolError::MalformedMessage { round: 2, .. }
        ));
        assert_eq!(culprit_ids(&report), vec!["carol"]);
    }

    // carol's peers aborted before revealing; nothing reaches her
    assert!(results[2].try_take().is_none());
    assert_eq!(parties[2].status(), SessionStatus::Running { round: 2 });
    let waiting: Vec<String> = parties[2]
        .waiting_for()
        .unwrap()
        .iter()
        .map(|p| p.id().to_owned())
        .collect();
    assert_eq!(waiting, vec!["alice", "bob"]);
}
