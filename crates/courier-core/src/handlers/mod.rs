//! Typed handler API.
//!
//! Two-layer design: the typed surface (`Event`, `Handler<E>`) keeps event
//! kinds and payload schemas matched at compile time; the erased layer
//! (`EffectHandler`) is what the registry stores and the dispatcher calls.

pub mod event;
pub mod handler;
pub mod registry;

pub use event::{BroadcastMessage, DepositConfirmed, Event, WithdrawalRequested};
pub use handler::{EffectHandler, Handler, TypedHandler};
pub use registry::HandlerRegistry;
