use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::collections::VecMap;

use super::{party_registry::PartyId, protocol_info::ProtocolInfo};

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Parties blamed for an abort, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culprits(Vec<PartyId>);

impl Culprits {
    pub fn from_vec(parties: Vec<PartyId>) -> Self {
        Self(parties)
    }
    pub fn as_slice(&self) -> &[PartyId] {
        &self.0
    }
    pub fn into_vec(self) -> Vec<PartyId> {
        self.0
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<PartyId> {
        self.0.iter()
    }
}

impl fmt::Display for Culprits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, party) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", party)?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("round {round} already started")]
    AlreadyStarted { round: usize },
    #[error("round {round}: verification failed, culprits {culprits}")]
    VerificationFailed { round: usize, culprits: Culprits },
    #[error("round {round}: malformed message, culprits {culprits}")]
    MalformedMessage { round: usize, culprits: Culprits },
    #[error("round {round}: missing message, culprits {culprits}")]
    MissingMessage { round: usize, culprits: Culprits },
    #[error("transport failure: {0}")]
    TransportError(String),
    /// An internal invariant was violated. Details are logged at the point of failure.
    #[error("fatal internal error")]
    Fatal,
}

impl ProtocolError {
    pub fn transport(err: impl fmt::Display) -> Self {
        Self::TransportError(err.to_string())
    }

    /// Empty for errors that blame nobody.
    pub fn culprits(&self) -> &[PartyId] {
        match self {
            Self::VerificationFailed { culprits, .. }
            | Self::MalformedMessage { culprits, .. }
            | Self::MissingMessage { culprits, .. } => culprits.as_slice(),
            Self::AlreadyStarted { .. } | Self::TransportError(_) | Self::Fatal => &[],
        }
    }

    pub fn round(&self) -> Option<usize> {
        match self {
            Self::AlreadyStarted { round }
            | Self::VerificationFailed { round, .. }
            | Self::MalformedMessage { round, .. }
            | Self::MissingMessage { round, .. } => Some(*round),
            Self::TransportError(_) | Self::Fatal => None,
        }
    }
}

/// The single terminal report handed to the session owner on abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task}, party {victim}, round {round}: {error}")]
pub struct SessionError {
    pub task: String,
    /// `0` if the session aborted before its first round started.
    pub round: usize,
    pub victim: PartyId,
    #[source]
    pub error: ProtocolError,
}

/// Every party whose entry in `verdict` is `false`, in registry order.
pub fn collect_culprits<P>(
    info: &ProtocolInfo<P>,
    verdict: &VecMap<P, bool>,
) -> ProtocolResult<Culprits> {
    if verdict.len() != info.party_count() {
        error!(
            "verdict size {} differs from party count {}",
            verdict.len(),
            info.party_count()
        );
        return Err(ProtocolError::Fatal);
    }
    info.registry()
        .culprits(verdict.iter().filter(|(_, ok)| !**ok).map(|(i, _)| i))
}

/// Turn a fan-out verdict into the round's outcome.
pub fn check_verdict<P>(
    info: &ProtocolInfo<P>,
    round: usize,
    verdict: &VecMap<P, bool>,
) -> ProtocolResult<()> {
    let culprits = collect_culprits(info, verdict)?;
    for (peer, ok) in verdict.iter().filter(|(i, _)| *i != info.my_index()) {
        let party = info.registry().get(peer)?;
        if *ok {
            debug!("round {}: verified peer {}", round, party);
        } else {
            warn!("round {}: verification failed for peer {}", round, party);
        }
    }
    if culprits.is_empty() {
        return Ok(());
    }
    Err(ProtocolError::VerificationFailed { round, culprits })
}
