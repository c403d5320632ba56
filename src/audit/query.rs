//! Audit trail queries

use chrono::{DateTime, Utc};

use super::record::AuditRecord;

/// Filter over the trail. Empty query returns everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    pub node_id: Option<String>,
    /// Inclusive lower bound on the record timestamp
    pub since: Option<DateTime<Utc>>,
    /// Keep only the most recent N matches
    pub last: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_node(node_id: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id.into()),
            ..Self::default()
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn last(mut self, n: usize) -> Self {
        self.last = Some(n);
        self
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(node_id) = &self.node_id {
            if &record.node_id != node_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        true
    }

    /// Applies the filter, keeping append order.
    pub fn run(&self, records: Vec<AuditRecord>) -> Vec<AuditRecord> {
        let mut matched: Vec<AuditRecord> =
            records.into_iter().filter(|r| self.matches(r)).collect();
        if let Some(n) = self.last {
            let skip = matched.len().saturating_sub(n);
            matched.drain(..skip);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditOp;
    use crate::document::Document;
    use crate::fingerprint::fingerprint;
    use chrono::Duration;

    fn at(node: &str, version: u64, minutes_ago: i64) -> AuditRecord {
        let doc = Document::new(node, "item", "T");
        let mut record = AuditRecord::new(node, AuditOp::Set, "tester", fingerprint(&doc), version);
        record.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    #[test]
    fn test_filters_by_node() {
        let records = vec![at("a", 1, 3), at("b", 1, 2), at("a", 2, 1)];
        let found = AuditQuery::for_node("a").run(records);
        assert_eq!(found.iter().map(|r| r.version).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_since_is_inclusive_lower_bound() {
        let records = vec![at("a", 1, 60), at("a", 2, 5)];
        let cutoff = records[1].timestamp;
        let found = AuditQuery::for_node("a").since(cutoff).run(records);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, 2);
    }

    #[test]
    fn test_last_keeps_most_recent_in_order() {
        let records = vec![at("a", 1, 3), at("a", 2, 2), at("a", 3, 1)];
        let found = AuditQuery::for_node("a").last(2).run(records);
        assert_eq!(found.iter().map(|r| r.version).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_last_larger_than_matches() {
        let found = AuditQuery::new().last(10).run(vec![at("a", 1, 1)]);
        assert_eq!(found.len(), 1);
    }
}
