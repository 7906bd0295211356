pub mod api;

mod error;
mod fanout;
mod orchestrator;
mod params;
mod party_registry;
mod protocol_info;
mod round;
mod round_state;
mod timing;
mod transport;
mod verifier;
pub(crate) mod wire_bytes;
