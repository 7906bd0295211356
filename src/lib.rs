//! A round-based engine for threshold key generation.
//!
//! [sdk] holds the protocol-agnostic machinery: party registry, round contract,
//! concurrent proof verification and the orchestrator that drives one party through a
//! session. [keygen] is a four-round key generation protocol built on it.
pub mod collections;
mod crypto_tools;
pub mod keygen;
pub mod sdk;
