//! Daily digest: compress a finished day's log into one memory record.
//!
//! Runs at most once per calendar day. The newest digested day is kept as a
//! watermark in the state file so a restart does not summarise a day twice.

use archie_config::StateStore;
use archie_core::error::Error;
use archie_core::provider::{FragmentSink, Provider};
use archie_memory::{ConversationLog, VectorStore};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::StageParams;

pub const DIGEST: StageParams = StageParams {
    instruction: "Summarize this conversation to preserve key facts, decisions, tone, and ongoing themes.",
    temperature: 0.4,
    max_tokens: 512,
    stream: false,
};

/// What digesting one day produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    /// A memory record was added.
    Stored,
    /// The day had no readable turns or the summary was blank.
    Nothing,
    /// A summary was produced but memory did not accept it.
    NotStored,
}

pub struct DigestJob {
    provider: Arc<dyn Provider>,
    log: Arc<ConversationLog>,
    memory: Arc<VectorStore>,
    state: StateStore,
    model: String,
}

impl DigestJob {
    pub fn new(
        provider: Arc<dyn Provider>,
        log: Arc<ConversationLog>,
        memory: Arc<VectorStore>,
        state: StateStore,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            log,
            memory,
            state,
            model: model.into(),
        }
    }

    /// Summarise `day`'s turns. `None` when the day has no turns.
    pub async fn summarize_day(&self, day: NaiveDate) -> Result<Option<String>, Error> {
        let history = self.log.history(day).await?;
        if history.is_empty() {
            return Ok(None);
        }
        let request = DIGEST.request(&self.model, history);
        let summary = self.provider.send(request, FragmentSink::discard()).await?;
        Ok(Some(summary))
    }

    /// Summarise `day` and store the digest.
    ///
    /// Does not touch the watermark; used for forced digests.
    pub async fn digest_day(&self, day: NaiveDate) -> Result<DigestOutcome, Error> {
        let Some(summary) = self.summarize_day(day).await? else {
            debug!(%day, "Nothing to digest");
            return Ok(DigestOutcome::Nothing);
        };
        if summary.trim().is_empty() {
            warn!(%day, "Empty digest, skipping");
            return Ok(DigestOutcome::Nothing);
        }
        if self.memory.append(&summary).await {
            Ok(DigestOutcome::Stored)
        } else {
            Ok(DigestOutcome::NotStored)
        }
    }

    /// Days with a log, strictly before `today`, after the watermark.
    pub async fn pending_days(&self, today: NaiveDate) -> Result<Vec<NaiveDate>, Error> {
        let watermark = self.state.load().last_digested_day;
        Ok(self
            .log
            .days()
            .await?
            .into_iter()
            .filter(|d| *d < today && watermark.is_none_or(|w| *d > w))
            .collect())
    }

    /// Digest every pending day in order, advancing the watermark after each.
    ///
    /// Days with nothing to digest are passed over. Stops at the first day
    /// whose summary or store fails so it is retried next time.
    /// Returns the number of digests stored.
    pub async fn run_pending(&self, today: NaiveDate) -> usize {
        let days = match self.pending_days(today).await {
            Ok(days) => days,
            Err(e) => {
                warn!(error = %e, "Could not list days to digest");
                return 0;
            }
        };

        let mut digested = 0;
        for day in days {
            let stored = match self.digest_day(day).await {
                Ok(DigestOutcome::Stored) => true,
                Ok(DigestOutcome::Nothing) => false,
                Ok(DigestOutcome::NotStored) => {
                    warn!(%day, "Digest not stored, will retry");
                    break;
                }
                Err(e) => {
                    warn!(%day, error = %e, "Daily digest failed");
                    break;
                }
            };
            if let Err(e) = self.state.update(|s| s.last_digested_day = Some(day)) {
                warn!(error = %e, "Could not persist digest watermark");
                break;
            }
            if stored {
                info!(%day, "Day digested into memory");
                digested += 1;
            }
        }
        digested
    }

    /// Run [`DigestJob::run_pending`] in the background.
    pub fn spawn(self: Arc<Self>, today: NaiveDate) -> JoinHandle<usize> {
        tokio::spawn(async move { self.run_pending(today).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use archie_core::error::ProviderError;
    use archie_core::message::{ConversationTurn, Role};
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        provider: Arc<ScriptedProvider>,
        log: Arc<ConversationLog>,
        memory: Arc<VectorStore>,
        state: StateStore,
        job: Arc<DigestJob>,
    }

    fn harness(provider: ScriptedProvider) -> Harness {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(provider);
        let log = Arc::new(ConversationLog::new(dir.path().join("logs")));
        let memory = Arc::new(VectorStore::new(
            dir.path().join("memory-vectors.json"),
            provider.clone(),
            "m",
        ));
        let state_path = dir.path().join("state.json");
        let job = Arc::new(DigestJob::new(
            provider.clone(),
            log.clone(),
            memory.clone(),
            StateStore::new(state_path.clone()),
            "gpt-4o-mini",
        ));
        Harness {
            _dir: dir,
            provider,
            log,
            memory,
            state: StateStore::new(state_path),
            job,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    async fn log_on(log: &ConversationLog, d: NaiveDate, request: &str) {
        let ts = Local
            .from_local_datetime(&d.and_hms_opt(10, 0, 0).unwrap())
            .single()
            .unwrap();
        log.append_turn(ConversationTurn {
            timestamp: ts,
            request: request.into(),
            response: "noted".into(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn digests_completed_days_once() {
        let h = harness(ScriptedProvider::new("unused").route(DIGEST.instruction, "digest"));
        log_on(&h.log, day(1), "monday").await;
        log_on(&h.log, day(2), "tuesday").await;
        log_on(&h.log, day(3), "today").await;

        assert_eq!(h.job.clone().spawn(day(3)).await.unwrap(), 2);
        assert_eq!(h.memory.len().await, 2);
        assert_eq!(h.state.load().last_digested_day, Some(day(2)));

        // Second run finds nothing new
        assert_eq!(h.job.run_pending(day(3)).await, 0);
        assert_eq!(h.provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn summary_request_replays_the_day() {
        let h = harness(ScriptedProvider::new("unused").route(DIGEST.instruction, "digest"));
        log_on(&h.log, day(1), "remember the milk").await;

        assert_eq!(h.job.digest_day(day(1)).await.unwrap(), DigestOutcome::Stored);

        let req = h.provider.request_for(DIGEST.instruction).unwrap();
        assert_eq!(req.model, "gpt-4o-mini");
        assert!(!req.stream);
        assert_eq!(req.max_tokens, 512);
        let roles: Vec<Role> = req.messages.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(req.messages[1].content(), "remember the milk");
    }

    #[tokio::test]
    async fn failure_keeps_watermark_for_retry() {
        let h = harness(ScriptedProvider::new("unused").fail(
            DIGEST.instruction,
            ProviderError::Network("offline".into()),
        ));
        log_on(&h.log, day(1), "monday").await;

        assert_eq!(h.job.run_pending(day(2)).await, 0);
        assert_eq!(h.state.load().last_digested_day, None);
        assert!(h.memory.is_empty().await);
    }

    #[tokio::test]
    async fn empty_day_is_not_digested() {
        let h = harness(ScriptedProvider::new("digest"));
        assert_eq!(h.job.digest_day(day(1)).await.unwrap(), DigestOutcome::Nothing);
        assert!(h.provider.requests().is_empty());
    }

    #[tokio::test]
    async fn unreadable_day_does_not_block_later_days() {
        let h = harness(ScriptedProvider::new("unused").route(DIGEST.instruction, "digest"));
        log_on(&h.log, day(2), "tuesday").await;
        std::fs::write(h.log.path_for(day(1)), "not json").unwrap();

        assert_eq!(h.job.run_pending(day(3)).await, 1);
        assert_eq!(h.memory.len().await, 1);
        assert_eq!(h.state.load().last_digested_day, Some(day(2)));

        // The watermark moved past both days
        assert_eq!(h.job.run_pending(day(3)).await, 0);
        assert_eq!(h.provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn blank_summary_advances_watermark() {
        let h = harness(ScriptedProvider::new("unused").route(DIGEST.instruction, "  "));
        log_on(&h.log, day(1), "monday").await;

        assert_eq!(h.job.run_pending(day(2)).await, 0);
        assert_eq!(h.state.load().last_digested_day, Some(day(1)));
        assert!(h.memory.is_empty().await);
    }

    #[tokio::test]
    async fn rejected_store_keeps_watermark() {
        let h = harness(
            ScriptedProvider::new("unused")
                .route(DIGEST.instruction, "digest")
                .without_embeddings(),
        );
        log_on(&h.log, day(1), "monday").await;

        assert_eq!(h.job.run_pending(day(2)).await, 0);
        assert_eq!(h.state.load().last_digested_day, None);
    }

    #[tokio::test]
    async fn pending_respects_watermark() {
        let h = harness(ScriptedProvider::new("digest"));
        for d in 1..=4 {
            log_on(&h.log, day(d), "x").await;
        }
        h.state.update(|s| s.last_digested_day = Some(day(2))).unwrap();
        assert_eq!(h.job.pending_days(day(4)).await.unwrap(), vec![day(3)]);
    }
}
