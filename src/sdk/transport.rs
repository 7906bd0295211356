use crate::collections::TypedUsize;

use super::api::{ProtocolMessage, ProtocolResult};

/// Outbound message delivery. Implementations report failures as
/// [super::api::ProtocolError::TransportError].
pub trait Transport<P, M> {
    fn broadcast(&mut self, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()>;
    fn send_to(&mut self, to: TypedUsize<P>, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()>;
}

impl<P, M, T> Transport<P, M> for &mut T
where
    T: Transport<P, M> + ?Sized,
{
    fn broadcast(&mut self, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()> {
        (**self).broadcast(msg)
    }
    fn send_to(&mut self, to: TypedUsize<P>, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()> {
        (**self).send_to(to, msg)
    }
}
