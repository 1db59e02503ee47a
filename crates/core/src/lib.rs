//! # archie core
//!
//! Domain types, traits, and error definitions for the archie conversational
//! assistant. This crate has **no I/O of its own**; it defines the domain
//! model that the provider, memory, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! The remote model is reached only through the [`Provider`] trait. Every
//! other crate depends inward on core, so the orchestration pipeline can be
//! driven by a scripted provider in tests and by the OpenAI-compatible client
//! in production.

pub mod error;
pub mod memory;
pub mod message;
pub mod persona;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, StorageError};
pub use memory::MemoryRecord;
pub use message::{ConversationTurn, Message, Role};
pub use persona::{Persona, PersonaUpdate};
pub use provider::{EmbeddingRequest, FragmentSink, Provider, ProviderRequest};
