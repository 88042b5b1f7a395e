//! Handler registry: event kind -> effect handler.
//!
//! Built during initialization (mutable), then shared immutably with every
//! worker. No locks at dispatch time.

use std::collections::HashMap;
use std::sync::Arc;

use super::event::Event;
use super::handler::{EffectHandler, Handler, TypedHandler};
use crate::domain::{EventKind, OutboxError};

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Arc<dyn EffectHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for `E`'s event kind.
    ///
    /// Double registration is an error rather than last-wins; silently
    /// replacing a financial side-effect handler is how money disappears.
    pub fn register<E: Event, H: Handler<E> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), OutboxError> {
        if self.handlers.contains_key(&E::KIND) {
            return Err(OutboxError::DuplicateHandler(E::KIND));
        }
        self.handlers
            .insert(E::KIND, Arc::new(TypedHandler::<E, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, kind: EventKind) -> Option<&Arc<dyn EffectHandler>> {
        self.handlers.get(&kind)
    }

    pub fn registered_kinds(&self) -> Vec<EventKind> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
