//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! This approximation is accurate within ~10% for BPE tokenizers
//! (the GPT-4o family included) on English text and is fully deterministic.

use archie_core::message::Message;

/// Framing cost the remote model charges per message (role markers and
/// delimiters), on top of the role name and content.
pub const MESSAGE_OVERHEAD: usize = 4;

/// Maps text to a token count.
///
/// Implementations must be pure: the same text always costs the same.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;

    /// `estimate(role) + estimate(content) + MESSAGE_OVERHEAD`.
    fn message_cost(&self, message: &Message) -> usize {
        self.estimate(message.role().as_str()) + self.estimate(message.content()) + MESSAGE_OVERHEAD
    }

    fn messages_cost(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.message_cost(m)).sum()
    }
}

/// The 4-characters-per-token heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters (not bytes). Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
