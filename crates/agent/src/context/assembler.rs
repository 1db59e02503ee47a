//! Context assembly: the message sequence sent on every turn.
//!
//! The assembled context has three parts, in order:
//!
//! 1. **System** (persona fields + recalled memories), never trimmed
//! 2. **Conversation History** (today's turns), oldest dropped first
//! 3. **User message** (the new prompt), never trimmed
//!
//! # Determinism
//!
//! Assembly is deterministic: identical inputs always produce identical
//! outputs. No random or time-dependent logic is used.

use archie_core::message::Message;
use serde::{Deserialize, Serialize};

use crate::context::token::{HeuristicEstimator, TokenEstimator};
use crate::prompt;

/// Token budget configuration.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    /// The model's context window.
    pub context_window: usize,
    /// Held back for the answer.
    pub response_reserve: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            context_window: 128_000,
            response_reserve: 2048,
        }
    }
}

/// The assembled context, ready for a completion call.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// System message, trimmed history, then the user message.
    pub messages: Vec<Message>,
    pub metadata: AssemblyMetadata,
}

impl AssembledContext {
    /// The combined persona and memory system message.
    pub fn system(&self) -> &Message {
        &self.messages[0]
    }
}

/// Token accounting for one assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// What was left for history after the reserve, system and user message.
    pub history_budget: usize,
    /// Cost of the history actually kept.
    pub history_tokens: usize,
    pub history_kept: usize,
    pub history_dropped: usize,
    /// Cost of every assembled message.
    pub total_tokens: usize,
}

/// The context assembler. Stateless; create one and reuse it.
pub struct ContextAssembler<E = HeuristicEstimator> {
    estimator: E,
    budget: TokenBudget,
}

impl ContextAssembler {
    pub fn new(budget: TokenBudget) -> Self {
        Self::with_estimator(HeuristicEstimator, budget)
    }
}

impl<E: TokenEstimator> ContextAssembler<E> {
    pub fn with_estimator(estimator: E, budget: TokenBudget) -> Self {
        Self { estimator, budget }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Keep the longest suffix of `history` whose cumulative cost fits
    /// `limit`, dropping whole messages from the oldest end.
    ///
    /// The most recent message is always kept, even when it alone exceeds
    /// `limit`.
    pub fn trim(&self, history: &[Message], limit: usize) -> Vec<Message> {
        let mut used = 0usize;
        let mut start = history.len();

        for (i, message) in history.iter().enumerate().rev() {
            let cost = self.estimator.message_cost(message);
            if start < history.len() && used + cost > limit {
                break;
            }
            used += cost;
            start = i;
        }

        history[start..].to_vec()
    }

    /// Assemble `[system(persona + memories), trimmed history, user(prompt)]`.
    ///
    /// The history budget is the context window minus the response reserve
    /// and the cost of the system and user messages.
    pub fn build(
        &self,
        system: &str,
        recent_history: &[Message],
        relevant_memory: &[String],
        new_prompt: &str,
    ) -> AssembledContext {
        let system = Message::system(prompt::with_memories(system, relevant_memory));
        let user = Message::user(new_prompt);

        let fixed = self.estimator.message_cost(&system) + self.estimator.message_cost(&user);
        let history_budget = self
            .budget
            .context_window
            .saturating_sub(self.budget.response_reserve)
            .saturating_sub(fixed);

        let kept = if history_budget == 0 {
            Vec::new()
        } else {
            self.trim(recent_history, history_budget)
        };
        let history_tokens = self.estimator.messages_cost(&kept);

        let metadata = AssemblyMetadata {
            history_budget,
            history_tokens,
            history_kept: kept.len(),
            history_dropped: recent_history.len() - kept.len(),
            total_tokens: fixed + history_tokens,
        };
        if metadata.history_dropped > 0 {
            tracing::debug!(
                dropped = metadata.history_dropped,
                budget = history_budget,
                "Trimmed conversation history"
            );
        }

        let mut messages = Vec::with_capacity(kept.len() + 2);
        messages.push(system);
        messages.extend(kept);
        messages.push(user);

        AssembledContext { messages, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archie_core::message::Role;

    fn assembler() -> ContextAssembler {
        ContextAssembler::new(TokenBudget::default())
    }

    fn history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question number {i}"))
                } else {
                    Message::assistant(format!("answer number {i}"))
                }
            })
            .collect()
    }

    fn cost(messages: &[Message]) -> usize {
        HeuristicEstimator.messages_cost(messages)
    }

    #[test]
    fn everything_fits() {
        let hist = history(6);
        let kept = assembler().trim(&hist, 10_000);
        assert_eq!(kept, hist);
    }

    #[test]
    fn budget_invariant_holds_for_every_limit() {
        let a = assembler();
        let hist = history(10);
        let newest = HeuristicEstimator.message_cost(hist.last().unwrap());

        for limit in newest..=cost(&hist) + 5 {
            let kept = a.trim(&hist, limit);
            assert!(cost(&kept) <= limit, "limit {limit} exceeded");
            assert!(!kept.is_empty());
        }
    }

    #[test]
    fn keeps_most_recent_suffix_in_order() {
        let a = assembler();
        let hist = history(10);
        let limit = cost(&hist[6..]);

        let kept = a.trim(&hist, limit);
        assert_eq!(kept, hist[6..].to_vec());

        // Adding one token short of the next message keeps the same suffix
        let kept = a.trim(&hist, limit + HeuristicEstimator.message_cost(&hist[5]) - 1);
        assert_eq!(kept, hist[6..].to_vec());
    }

    #[test]
    fn oversized_newest_message_is_still_kept() {
        let a = assembler();
        let mut hist = history(4);
        hist.push(Message::user("x".repeat(400)));

        let kept = a.trim(&hist, 10);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].content().len(), 400);
        // The one accepted overshoot: cost exceeds the limit by that message
        assert!(cost(&kept) > 10);
    }

    #[test]
    fn empty_history_trims_to_empty() {
        assert!(assembler().trim(&[], 100).is_empty());
    }

    #[test]
    fn build_orders_system_history_user() {
        let a = assembler();
        let hist = history(4);
        let ctx = a.build("You are Archie.", &hist, &["likes tea".to_string()], "hello?");

        assert_eq!(ctx.messages.len(), 6);
        assert_eq!(ctx.system().role(), Role::System);
        assert!(ctx.system().content().starts_with("You are Archie."));
        assert!(ctx.system().content().contains("likes tea"));
        assert_eq!(&ctx.messages[1..5], &hist[..]);
        assert_eq!(ctx.messages[5], Message::user("hello?"));
        assert_eq!(ctx.metadata.history_dropped, 0);
    }

    #[test]
    fn build_budget_excludes_system_and_user() {
        let system = "s".repeat(400);
        let hist = history(8);
        let probe = assembler().build(&system, &[], &[], "prompt");
        let fixed = probe.metadata.total_tokens;

        // Room for exactly the last two history messages
        let room = cost(&hist[6..]);
        let a = ContextAssembler::new(TokenBudget {
            context_window: 100 + fixed + room,
            response_reserve: 100,
        });
        let ctx = a.build(&system, &hist, &[], "prompt");

        assert_eq!(ctx.metadata.history_budget, room);
        assert_eq!(ctx.metadata.history_kept, 2);
        assert_eq!(ctx.metadata.history_dropped, 6);
        assert!(ctx.metadata.history_tokens <= ctx.metadata.history_budget);
        assert_eq!(&ctx.messages[1..3], &hist[6..]);
    }

    #[test]
    fn no_room_drops_all_history() {
        let a = ContextAssembler::new(TokenBudget {
            context_window: 50,
            response_reserve: 2048,
        });
        let ctx = a.build("system", &history(4), &[], "prompt");
        assert_eq!(ctx.messages.len(), 2);
        assert_eq!(ctx.metadata.history_budget, 0);
    }

    #[test]
    fn build_is_deterministic() {
        let a = assembler();
        let hist = history(5);
        let mem = vec!["m1".to_string(), "m2".to_string()];
        let first = a.build("sys", &hist, &mem, "p");
        let second = a.build("sys", &hist, &mem, "p");
        assert_eq!(first.messages, second.messages);
        assert_eq!(first.metadata, second.metadata);
    }
}
