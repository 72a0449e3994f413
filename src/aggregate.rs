use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tokio::time::Instant;

use crate::error::{ResolveError, ResolveResult};
use crate::model::CanonicalRecord;

/// Records of one batch, in candidate order, with the batch wall time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultAggregate {
    pub records: Vec<CanonicalRecord>,
    pub elapsed: Duration,
}

impl ResultAggregate {
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn degraded_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_degraded()).count()
    }
}

impl Serialize for ResultAggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ResultAggregate", 3)?;
        s.serialize_field("count", &self.count())?;
        s.serialize_field("elapsed_secs", &self.elapsed.as_secs_f64())?;
        s.serialize_field("records", &self.records)?;
        s.end()
    }
}

/// Collects merged records by candidate index, so completion order under
/// concurrent resolution does not leak into the result.
#[derive(Debug)]
pub struct Aggregator {
    started: Instant,
    slots: Vec<Option<CanonicalRecord>>,
}

impl Aggregator {
    pub fn new(started: Instant, expected: usize) -> Self {
        Self {
            started,
            slots: vec![None; expected],
        }
    }

    pub fn insert(&mut self, index: usize, record: CanonicalRecord) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(record);
        } else {
            tracing::warn!("dropping record for out-of-range candidate index {index}");
        }
    }

    /// `what` names the query in the `NotFound` message.
    pub fn finish(self, what: &str) -> ResolveResult<ResultAggregate> {
        let records: Vec<CanonicalRecord> = self.slots.into_iter().flatten().collect();
        if records.is_empty() {
            return Err(ResolveError::NotFound(what.to_string()));
        }
        Ok(ResultAggregate {
            records,
            elapsed: self.started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnrollmentStatus, IdentityRecord, Provenance};
    use crate::normalize::Identifier;

    fn record(id: &str) -> CanonicalRecord {
        CanonicalRecord {
            identifier: Identifier::parse(id).unwrap(),
            identity: IdentityRecord::unknown(),
            enrollment: EnrollmentStatus::No,
            identity_source: Provenance::Remote,
            enrollment_source: Provenance::Remote,
        }
    }

    #[test]
    fn keeps_candidate_order() {
        let mut agg = Aggregator::new(Instant::now(), 3);
        agg.insert(2, record("3333333333"));
        agg.insert(0, record("1111111111"));
        agg.insert(1, record("2222222222"));
        let out = agg.finish("test").unwrap();
        let ids: Vec<&str> = out.records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, ["1111111111", "2222222222", "3333333333"]);
        assert_eq!(out.count(), 3);
    }

    #[test]
    fn empty_batch_is_not_found() {
        let agg = Aggregator::new(Instant::now(), 0);
        assert!(agg.finish("phone 555-123-4567").unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_covers_the_batch() {
        let agg = Aggregator::new(Instant::now(), 1);
        tokio::time::advance(Duration::from_millis(1500)).await;
        let mut agg = agg;
        agg.insert(0, record("1234567893"));
        let out = agg.finish("test").unwrap();
        assert!(out.elapsed >= Duration::from_millis(1500));
    }

    #[test]
    fn serializes_count_and_elapsed() {
        let aggregate = ResultAggregate {
            records: vec![record("1234567893")],
            elapsed: Duration::from_millis(250),
        };
        let json = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["elapsed_secs"], 0.25);
        assert_eq!(json["records"][0]["identifier"], "1234567893");
        assert_eq!(json["records"][0]["identity_source"], "REMOTE");
        assert_eq!(aggregate.degraded_count(), 1);
    }
}
