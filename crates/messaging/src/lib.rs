//! Messaging layer for the arena system.
//!
//! This crate owns the wire contract between the write side and the
//! read side:
//! - [`EventEnvelope`], the only schema both sides agree on
//! - Broker seams ([`MessagePublisher`], [`MessageSource`]) with an
//!   in-memory implementation for tests
//! - The [`Consumer`] fetch-process-commit loop with bounded retry and
//!   dead-lettering
//!
//! Delivery is at-least-once end to end; everything downstream of the
//! broker must absorb duplicates.

pub mod broker;
pub mod config;
pub mod consumer;
pub mod dead_letter;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod memory;

pub use broker::{MessagePublisher, MessageSource, RawMessage};
pub use config::ConsumerConfig;
pub use consumer::Consumer;
pub use dead_letter::{DeadLetterEnvelope, DeadLetterWriter};
pub use envelope::EventEnvelope;
pub use error::{BrokerError, ConsumerError, HandlerError};
pub use handler::EnvelopeHandler;
pub use memory::{InMemoryBroker, InMemoryConsumer};
