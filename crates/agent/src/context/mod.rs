//! Context assembly for a turn.
//!
//! | Part | Source | Trim Strategy |
//! |------|--------|---------------|
//! | System | Persona + recalled memories | Never trimmed |
//! | Conversation History | Today's log | Oldest messages dropped |
//! | User message | The new prompt | Never trimmed |

pub mod assembler;
pub mod token;

pub use assembler::{AssembledContext, AssemblyMetadata, ContextAssembler, TokenBudget};
pub use token::{HeuristicEstimator, TokenEstimator};
