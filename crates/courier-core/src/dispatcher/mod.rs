//! Dispatcher: configuration, worker loops, and the assembled [`Courier`].

pub mod builder;
pub mod config;
pub mod worker;

pub use builder::{BuildError, Courier, CourierBuilder};
pub use config::DispatcherConfig;
pub use worker::{WorkerGroup, run_once};
