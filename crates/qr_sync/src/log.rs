//! Ordered, deduplicated message log.
//!
//! Invariants:
//! - dedup key is the record id, not the timestamp
//! - records are immutable once inserted
//! - after every merge the log is sorted by `created_at` ascending, with
//!   ties broken by stable insertion order
//! - lives only in memory; every process start begins from empty

use std::collections::HashSet;

use qr_proto::MessageRecord;

#[derive(Default)]
pub struct MessageLog {
    records: Vec<MessageRecord>,
    seen_ids: HashSet<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    /// Insert a single record, keeping the log sorted. Returns false if a
    /// record with the same id is already present.
    pub fn insert(&mut self, record: MessageRecord) -> bool {
        if !self.seen_ids.insert(record.id.clone()) {
            return false;
        }
        self.records.push(record);
        self.resort();
        true
    }

    /// Merge a batch of records; returns how many were new.
    pub fn merge(&mut self, batch: Vec<MessageRecord>) -> usize {
        let mut appended = 0;
        for record in batch {
            if self.seen_ids.insert(record.id.clone()) {
                self.records.push(record);
                appended += 1;
            }
        }
        if appended > 0 {
            self.resort();
        }
        appended
    }

    fn resort(&mut self) {
        // Stable sort: equal timestamps keep their insertion order.
        self.records.sort_by_key(|record| record.created_at);
    }

    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use qr_proto::MessageRecord;

    fn record(id: &str, secs: i64) -> MessageRecord {
        MessageRecord::text(
            id,
            "alice",
            Some("bob".into()),
            None,
            format!("msg {id}"),
            Utc.timestamp_opt(secs, 0).single().expect("timestamp"),
        )
    }

    #[test]
    fn dedups_by_id() {
        let mut log = MessageLog::new();
        assert!(log.insert(record("a", 10)));
        assert!(!log.insert(record("a", 20)));
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].created_at.timestamp(), 10);
    }

    #[test]
    fn sorts_by_created_at() {
        let mut log = MessageLog::new();
        log.merge(vec![record("c", 30), record("a", 10), record("b", 20)]);
        let ids: Vec<&str> = log.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut log = MessageLog::new();
        log.merge(vec![record("first", 10), record("second", 10)]);
        log.merge(vec![record("third", 10), record("earlier", 5)]);
        let ids: Vec<&str> = log.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["earlier", "first", "second", "third"]);
    }

    #[test]
    fn merge_reports_new_count() {
        let mut log = MessageLog::new();
        assert_eq!(log.merge(vec![record("a", 1), record("b", 2)]), 2);
        assert_eq!(log.merge(vec![record("b", 2), record("c", 3)]), 1);
        assert_eq!(log.len(), 3);
    }
}
