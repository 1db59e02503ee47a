//! Persistence for archie: the per-day conversation log and the
//! long-horizon vector memory.

pub mod conversation_log;
pub mod snapshot;
pub mod vector;
pub mod vector_store;

pub use conversation_log::ConversationLog;
pub use vector::{cosine_similarity, rank_by_similarity};
pub use vector_store::VectorStore;
