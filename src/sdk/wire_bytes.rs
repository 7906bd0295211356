use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, warn};

use super::api::{BytesVec, ProtocolError, ProtocolMessage, ProtocolResult};

const WIRE_VERSION: u16 = 0;

pub fn encode_message<P, M: Serialize>(msg: &ProtocolMessage<P, M>) -> ProtocolResult<BytesVec> {
    encode(msg)
}

/// deserialization failures are non-fatal: do not return ProtocolResult
pub fn decode_message<P, M: DeserializeOwned>(bytes: &[u8]) -> Option<ProtocolMessage<P, M>> {
    decode(bytes)
}

pub fn encode<T: Serialize>(payload: &T) -> ProtocolResult<BytesVec> {
    serialize(&BytesVecVersioned {
        version: WIRE_VERSION,
        payload: serialize(payload)?,
    })
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    let bytes_versioned: BytesVecVersioned = bincode::deserialize(bytes)
        .map_err(|err| {
            warn!("outer deserialization failure: {}", err);
        })
        .ok()?;
    if bytes_versioned.version != WIRE_VERSION {
        warn!(
            "encoding version {}, expected {}",
            bytes_versioned.version, WIRE_VERSION
        );
        return None;
    }
    bincode::deserialize(&bytes_versioned.payload)
        .map_err(|err| {
            warn!("inner deserialization failure: {}", err);
        })
        .ok()
}

fn serialize<T: ?Sized + Serialize>(value: &T) -> ProtocolResult<BytesVec> {
    bincode::serialize(value).map_err(|err| {
        error!("serialization failure: {}", err);
        ProtocolError::Fatal
    })
}

#[derive(Serialize, Deserialize)]
struct BytesVecVersioned {
    version: u16,
    payload: BytesVec,
}
