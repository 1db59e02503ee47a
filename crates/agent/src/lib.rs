//! The conversation engine of archie.
//!
//! Each user turn flows through:
//!
//! 1. **Recall** relevant digests from vector memory
//! 2. **Build context** (persona + memories, today's history, the prompt)
//! 3. **Answer** via a single streamed call, or the fusion pipeline
//!    (summarize, analyze logically and creatively, synthesize)
//! 4. **Log** the turn, then digest any finished day in the background

pub mod context;
pub mod digest;
pub mod pipeline;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use context::{AssembledContext, AssemblyMetadata, ContextAssembler, TokenBudget};
pub use digest::{DigestJob, DigestOutcome};
pub use pipeline::{Mode, Orchestrator, TurnOutcome, TurnStage};
