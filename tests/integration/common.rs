use roundtable::sdk::api::{PartyId, SessionParams};

pub const NAMES: [&str; 7] = ["alice", "bob", "carol", "dave", "erin", "frank", "grace"];

/// Parties listed in reverse key order so that the registry has to sort them.
pub fn parties(count: usize) -> Vec<PartyId> {
    (0..count)
        .rev()
        .map(|i| {
            PartyId::new(
                NAMES[i],
                format!("validator-{}", NAMES[i]),
                vec![0x02, i as u8],
            )
        })
        .collect()
}

pub fn params() -> SessionParams {
    SessionParams::default()
        .with_task("integration-keygen")
        .with_concurrency(3)
}

pub fn set_up_logs() {
    // RUST_LOG=roundtable=debug for per-peer verification detail
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roundtable=info")),
        )
        .with_test_writer()
        .try_init();
}

pub mod keygen {
    use std::{
        collections::{HashMap, HashSet},
        sync::Arc,
        thread,
        time::Duration,
    };

    use rand::RngCore;
    use roundtable::{
        collections::VecMap,
        keygen::{
            new_keygen, Contribution, KeyShare, KeygenPartyId, KeygenPayload, KeygenSession,
            KeygenSuite, SecretShare,
        },
        sdk::api::{
            BytesVec, PartyId, ProofVerifier, ProtocolResult, SessionResult, Transport,
            VerificationError,
        },
    };
    use sha2::{Digest, Sha256};

    /// Hash-based stand-in for the real group arithmetic and proofs.
    #[derive(Default)]
    pub struct MockSuite {
        verifier: MockVerifier,
        bad_provers: HashSet<String>,
    }

    #[derive(Default)]
    pub struct MockVerifier {
        erroring: HashSet<String>,
        delays: HashMap<String, Duration>,
    }

    impl MockSuite {
        pub fn with_bad_prover(mut self, id: &str) -> Self {
            self.bad_provers.insert(id.to_string());
            self
        }
        pub fn with_verifier_error(mut self, id: &str) -> Self {
            self.verifier.erroring.insert(id.to_string());
            self
        }
        pub fn with_verify_delay(mut self, id: &str, delay: Duration) -> Self {
            self.verifier.delays.insert(id.to_string(), delay);
            self
        }
    }

    fn expected_proof(public_params: &[u8], party: &PartyId, group_key: &[u8]) -> BytesVec {
        Sha256::new()
            .chain_update(b"proof")
            .chain_update(public_params)
            .chain_update(party.key())
            .chain_update(group_key)
            .finalize()
            .to_vec()
    }

    impl KeygenSuite for MockSuite {
        fn contribute(&self, me: &PartyId) -> ProtocolResult<Contribution> {
            let mut secret = vec![0; 32];
            rand::thread_rng().fill_bytes(&mut secret);
            let public_share = Sha256::digest(&secret).to_vec();
            let public_params = Sha256::new()
                .chain_update(b"modulus")
                .chain_update(me.key())
                .finalize()
                .to_vec();
            Ok(Contribution::new(
                public_params,
                public_share,
                SecretShare::new(secret),
            ))
        }

        fn combine(
            &self,
            public_shares: &VecMap<KeygenPartyId, BytesVec>,
        ) -> ProtocolResult<BytesVec> {
            let mut hasher = Sha256::new();
            for (_, share) in public_shares.iter() {
                hasher.update(share);
            }
            Ok(hasher.finalize().to_vec())
        }

        fn prove(
            &self,
            contribution: &Contribution,
            me: &PartyId,
            group_key: &[u8],
        ) -> ProtocolResult<BytesVec> {
            if self.bad_provers.contains(me.id()) {
                return Ok(vec![0xde, 0xad]);
            }
            Ok(expected_proof(contribution.public_params(), me, group_key))
        }

        fn verifier(&self) -> &dyn ProofVerifier {
            &self.verifier
        }
    }

    impl ProofVerifier for MockVerifier {
        fn verify(
            &self,
            proof: &[u8],
            public_params: &[u8],
            claimed_identity: &PartyId,
            public_output: &[u8],
        ) -> Result<bool, VerificationError> {
            if let Some(delay) = self.delays.get(claimed_identity.id()) {
                thread::sleep(*delay);
            }
            if self.erroring.contains(claimed_identity.id()) {
                return Err(VerificationError::MalformedProof(format!(
                    "cannot parse proof of {}",
                    claimed_identity
                )));
            }
            Ok(proof == expected_proof(public_params, claimed_identity, public_output).as_slice())
        }
    }

    /// One session per party, all sharing `suite`, in registry order.
    pub fn initialize_parties<T, F>(
        count: usize,
        threshold: usize,
        suite: MockSuite,
        mut new_transport: F,
    ) -> Vec<(KeygenSession<T>, SessionResult<KeyShare>)>
    where
        T: Transport<KeygenPartyId, KeygenPayload>,
        F: FnMut(usize) -> T,
    {
        let mut parties = super::parties(count);
        parties.sort();
        let suite: Arc<dyn KeygenSuite> = Arc::new(suite);
        parties
            .iter()
            .enumerate()
            .map(|(i, me)| {
                new_keygen(
                    parties.clone(),
                    me,
                    threshold,
                    super::params(),
                    suite.clone(),
                    new_transport(i),
                )
                .expect("`new_keygen` failure")
            })
            .collect()
    }
}
