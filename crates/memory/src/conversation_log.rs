//! Daily conversation log, one JSON file per calendar day.
//!
//! Storage location: `~/.archie/logs/YYYY-MM-DD.json`, each file a JSON
//! array of `{timestamp, request, response}` in append order.
//!
//! Days are computed from the local system clock. A turn is never rewritten
//! once appended; the only destructive operation is [`ConversationLog::clear`].

use archie_core::error::StorageError;
use archie_core::message::{ConversationTurn, Message};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::snapshot::{self, Snapshot};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Append-only per-day record of turns.
///
/// Every append is a read-modify-write of the whole day file, serialized by
/// an internal lock.
pub struct ConversationLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ConversationLog {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Today on the local clock.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// The file holding `day`'s turns.
    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", day.format(DAY_FORMAT)))
    }

    /// Append a turn stamped now to today's log.
    pub async fn append(
        &self,
        request: &str,
        response: &str,
    ) -> Result<ConversationTurn, StorageError> {
        let turn = ConversationTurn::now(request, response);
        self.append_turn(turn.clone()).await?;
        Ok(turn)
    }

    /// Append a pre-built turn to the log of the day it was stamped on.
    pub async fn append_turn(&self, turn: ConversationTurn) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(turn.timestamp.date_naive());

        let mut turns = match snapshot::read::<ConversationTurn>(&path)? {
            Snapshot::Loaded(turns) => turns,
            Snapshot::Missing => Vec::new(),
            Snapshot::Corrupt(reason) => {
                let moved = snapshot::preserve_corrupt(&path)?;
                warn!(
                    path = %path.display(),
                    preserved = %moved.display(),
                    error = %reason,
                    "Corrupted conversation log, starting a fresh day file"
                );
                Vec::new()
            }
        };

        turns.push(turn);
        snapshot::write(&path, &turns)?;
        debug!(path = %path.display(), count = turns.len(), "Turn appended");
        Ok(())
    }

    /// All turns of `day` in append order; empty if there is no record.
    ///
    /// An unparsable day file is reported and treated as empty.
    pub async fn read(&self, day: NaiveDate) -> Result<Vec<ConversationTurn>, StorageError> {
        let path = self.path_for(day);
        match snapshot::read(&path)? {
            Snapshot::Corrupt(reason) => {
                warn!(path = %path.display(), error = %reason, "Corrupted conversation log, treating as empty");
                Ok(Vec::new())
            }
            other => Ok(other.into_records()),
        }
    }

    pub async fn read_today(&self) -> Result<Vec<ConversationTurn>, StorageError> {
        self.read(Self::today()).await
    }

    /// The last `n` turns of `day` (all of them when `n` is 0).
    pub async fn tail(&self, day: NaiveDate, n: usize) -> Result<Vec<ConversationTurn>, StorageError> {
        let mut turns = self.read(day).await?;
        if n > 0 && turns.len() > n {
            turns.drain(..turns.len() - n);
        }
        Ok(turns)
    }

    /// `day`'s turns as alternating user/assistant messages.
    pub async fn history(&self, day: NaiveDate) -> Result<Vec<Message>, StorageError> {
        Ok(self
            .read(day)
            .await?
            .iter()
            .flat_map(ConversationTurn::to_messages)
            .collect())
    }

    /// Days that have a log file, oldest first.
    pub async fn days(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        };

        let mut days: Vec<NaiveDate> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let stem = name.to_str()?.strip_suffix(".json")?;
                NaiveDate::parse_from_str(stem, DAY_FORMAT).ok()
            })
            .collect();
        days.sort();
        Ok(days)
    }

    /// Remove every day's log. Irreversible.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archie_core::message::Role;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn turn_on(day: NaiveDate, request: &str) -> ConversationTurn {
        let ts = Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .single()
            .unwrap();
        ConversationTurn {
            timestamp: ts,
            request: request.into(),
            response: format!("re: {request}"),
        }
    }

    #[tokio::test]
    async fn appends_read_back_in_order() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().join("logs"));

        log.append("r1", "resp1").await.unwrap();
        log.append("r2", "resp2").await.unwrap();

        let turns = log.read_today().await.unwrap();
        let pairs: Vec<_> = turns
            .iter()
            .map(|t| (t.request.as_str(), t.response.as_str()))
            .collect();
        assert_eq!(pairs, vec![("r1", "resp1"), ("r2", "resp2")]);
    }

    #[tokio::test]
    async fn clear_empties_every_day() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().join("logs"));
        let yesterday = ConversationLog::today().pred_opt().unwrap();

        log.append_turn(turn_on(yesterday, "old")).await.unwrap();
        log.append("r1", "resp1").await.unwrap();
        log.clear().await.unwrap();

        assert!(log.read_today().await.unwrap().is_empty());
        assert!(log.read(yesterday).await.unwrap().is_empty());
        assert!(log.days().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_day_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().to_path_buf());
        let day = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        assert!(log.read(day).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn days_are_independent_and_sorted() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().to_path_buf());
        let d1 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let d0 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        log.append_turn(turn_on(d1, "second day")).await.unwrap();
        log.append_turn(turn_on(d0, "first day")).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(log.days().await.unwrap(), vec![d0, d1]);
        assert_eq!(log.read(d0).await.unwrap()[0].request, "first day");
        assert_eq!(log.read(d1).await.unwrap()[0].request, "second day");
    }

    #[tokio::test]
    async fn history_alternates_roles() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().to_path_buf());
        log.append("hi", "hello").await.unwrap();
        log.append("how are you", "fine").await.unwrap();

        let history = log.history(ConversationLog::today()).await.unwrap();
        let roles: Vec<Role> = history.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(history[3].content(), "fine");
    }

    #[tokio::test]
    async fn tail_keeps_most_recent() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().to_path_buf());
        for i in 0..5 {
            log.append(&format!("q{i}"), "a").await.unwrap();
        }
        let today = ConversationLog::today();
        let last_two: Vec<_> = log
            .tail(today, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.request)
            .collect();
        assert_eq!(last_two, vec!["q3", "q4"]);
        assert_eq!(log.tail(today, 0).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn corrupted_day_reads_empty_and_is_preserved_on_append() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().to_path_buf());
        let path = log.path_for(ConversationLog::today());
        std::fs::write(&path, "this is not json").unwrap();

        assert!(log.read_today().await.unwrap().is_empty());

        log.append("after", "corruption").await.unwrap();
        assert_eq!(log.read_today().await.unwrap().len(), 1);
        let preserved = dir.path().join(format!(
            "{}.corrupt",
            path.file_name().unwrap().to_string_lossy()
        ));
        assert_eq!(std::fs::read_to_string(preserved).unwrap(), "this is not json");
    }

    #[tokio::test]
    async fn persisted_file_is_json_array() {
        let dir = TempDir::new().unwrap();
        let log = ConversationLog::new(dir.path().to_path_buf());
        log.append("q", "a").await.unwrap();

        let raw = std::fs::read_to_string(log.path_for(ConversationLog::today())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["request"], "q");
        assert_eq!(first["response"], "a");
        assert!(first["timestamp"].is_string());
    }
}
