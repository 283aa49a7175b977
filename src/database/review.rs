use anyhow::Result;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Database, Iter};
use crate::api::review::Review;
use crate::tagging::{Accuracy, FeedbackType, Performance, Sentiment};

/// Stored form of one customer-service review.
///
/// A record constructed without explicit tags takes the default
/// `{sentiment: Neutral, performance: Average, accuracy: OrderAccurate}`;
/// the defaults live on the enums, not in ambient schema state.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct ReviewRecord {
    pub(crate) agent_name: String,
    pub(crate) rating: f64,
    pub(crate) review_text: String,
    pub(crate) delivery_time: f64,
    pub(crate) location: String,
    pub(crate) order_type: String,
    pub(crate) customer_feedback_type: FeedbackType,
    pub(crate) price_range: String,
    pub(crate) discount_applied: bool,
    pub(crate) product_availability: String,
    pub(crate) customer_service_rating: f64,
    pub(crate) order_accuracy: String,
    pub(crate) sentiment: Sentiment,
    pub(crate) performance: Performance,
    pub(crate) accuracy: Accuracy,
    /// Not part of the CSV contract; populated by other producers and
    /// consumed by the discount histogram.
    pub(crate) discount_range: Option<String>,
    /// Not part of the CSV contract; consumed by complaint clustering.
    pub(crate) complaint_type: Option<String>,
    pub(crate) created_at: Timestamp,
    pub(crate) updated_at: Timestamp,
}

impl Database {
    /// Insert a batch of records, returning the assigned ids in order.
    pub(crate) fn insert_reviews(&self, records: Vec<ReviewRecord>) -> Result<Vec<u64>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = self.next_id()?;
            Database::insert(id, &record, &self.review_partition)?;
            ids.push(id);
        }
        Ok(ids)
    }

    pub(crate) fn reviews(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Iter<Review> {
        let start = start.unwrap_or(b"\x00");
        if let Some(end) = end {
            Iter::new(self.review_partition.range(start..end))
        } else {
            Iter::new(self.review_partition.range(start..))
        }
    }

    pub(crate) fn review(&self, id: u64) -> Result<Option<ReviewRecord>> {
        match self.review_partition.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn update_review(&self, id: u64, record: &ReviewRecord) -> Result<()> {
        Database::insert(id, record, &self.review_partition)
    }
}

#[cfg(test)]
mod tests {
    use super::ReviewRecord;
    use crate::{
        database::Database,
        tagging::{Accuracy, FeedbackType, Performance, Sentiment},
    };

    fn connect() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        (dir, db)
    }

    #[test]
    fn insert_assigns_monotonic_ids() {
        let (_dir, db) = connect();
        let ids = db
            .insert_reviews(vec![ReviewRecord::default(), ReviewRecord::default()])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
    }

    #[test]
    fn round_trip_preserves_tags() {
        let (_dir, db) = connect();
        let record = ReviewRecord {
            agent_name: "Asha".to_string(),
            rating: 4.5,
            sentiment: Sentiment::Positive,
            performance: Performance::Slow,
            accuracy: Accuracy::OrderMistake,
            customer_feedback_type: FeedbackType::Negative,
            ..Default::default()
        };
        let ids = db.insert_reviews(vec![record.clone()]).unwrap();
        let stored = db.review(ids[0]).unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn missing_id_reads_as_none() {
        let (_dir, db) = connect();
        assert!(db.review(12345).unwrap().is_none());
    }

    #[test]
    fn update_overwrites_in_place() {
        let (_dir, db) = connect();
        let ids = db.insert_reviews(vec![ReviewRecord::default()]).unwrap();
        let mut record = db.review(ids[0]).unwrap().unwrap();
        record.sentiment = Sentiment::Negative;
        db.update_review(ids[0], &record).unwrap();
        assert_eq!(
            db.review(ids[0]).unwrap().unwrap().sentiment,
            Sentiment::Negative
        );
    }
}
