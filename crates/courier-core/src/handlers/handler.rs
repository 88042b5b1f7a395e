//! Handler traits: the typed surface and the object-safe erasure layer.

use async_trait::async_trait;
use std::marker::PhantomData;

use super::event::Event;
use crate::domain::{EventKind, EventPayload, HandlerError};

/// Executes the side effect for one event type.
///
/// Handlers must be safely re-invocable for the same logical event: a
/// crashed worker's claim may be reclaimed and the handler run again even
/// though the side effect already partially happened. A handler that can
/// detect this should return [`HandlerError::Duplicate`], which the
/// dispatcher treats as success.
#[async_trait]
pub trait Handler<E: Event>: Send + Sync {
    async fn handle(&self, event: E) -> Result<(), HandlerError>;
}

/// Object-safe handler, storable as `Arc<dyn EffectHandler>`.
///
/// Two-layer design: users implement the typed [`Handler<E>`], the registry
/// stores the erased form and does payload decoding at the boundary.
#[async_trait]
pub trait EffectHandler: Send + Sync {
    async fn deliver(&self, payload: &EventPayload) -> Result<(), HandlerError>;

    fn kind(&self) -> EventKind;
}

/// Adapter turning a typed `Handler<E>` into an [`EffectHandler`].
pub struct TypedHandler<E: Event, H: Handler<E>> {
    handler: H,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Event, H: Handler<E>> TypedHandler<E, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event, H: Handler<E>> EffectHandler for TypedHandler<E, H> {
    async fn deliver(&self, payload: &EventPayload) -> Result<(), HandlerError> {
        // A payload that does not decode can never succeed on retry.
        let value = serde_json::to_value(payload)
            .map_err(|e| HandlerError::Permanent(format!("payload encode: {e}")))?;
        let event: E = serde_json::from_value(value)
            .map_err(|e| HandlerError::Permanent(format!("payload decode: {e}")))?;
        self.handler.handle(event).await
    }

    fn kind(&self) -> EventKind {
        E::KIND
    }
}
