//! API for roundtable users
pub use super::{
    error::{
        check_verdict, collect_culprits, Culprits, ProtocolError, ProtocolResult, SessionError,
    },
    fanout::{Verdict, VerificationFanout, VerifyTask},
    orchestrator::{RoundOrchestrator, SessionResult, SessionStatus},
    params::SessionParams,
    party_registry::{PartyId, PartyRegistry},
    protocol_info::ProtocolInfo,
    round::{Outbox, ProtocolMessage, Round, RoundMessage},
    round_state::{Expecting, RoundState},
    transport::Transport,
    verifier::{ProofVerifier, VerificationError},
};

pub type BytesVec = Vec<u8>;

pub const MAX_PARTY_COUNT: usize = 1000;

/// Inbound wire messages larger than this are rejected unless
/// [SessionParams::max_msg_len] says otherwise.
pub const DEFAULT_MAX_MSG_LEN: usize = 1 << 20;

/// Expose roundtable's (de)serialization functions
/// that use the appropriate bincode config options.
pub use super::wire_bytes::{decode, decode_message, encode, encode_message};
