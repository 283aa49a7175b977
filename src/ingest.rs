use std::io::Read;

use anyhow::{bail, Context, Result};
use csv::StringRecord;
use jiff::Timestamp;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    database::review::ReviewRecord,
    lexicon::Lexicon,
    tagging::{self, FeedbackType},
    Database,
};

/// Outcome of one CSV ingestion: how many records reached storage, and why
/// each rejected row was skipped.
#[derive(Debug, Serialize)]
pub(crate) struct IngestReport {
    pub(crate) inserted: usize,
    #[serde(rename = "failedRows")]
    pub(crate) failed_rows: Vec<FailedRow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FailedRow {
    /// 1-based data-row index, the way a spreadsheet user counts rows.
    pub(crate) row: usize,
    pub(crate) reason: String,
}

/// Stream reviews out of a CSV document, auto-tag each row, and bulk-insert
/// the surviving batch.
///
/// A malformed row is recorded and skipped; a storage failure aborts the
/// whole ingestion. The caller owns the upload artifact and must keep it
/// until this returns `Ok`.
pub(crate) fn ingest_csv<R: Read>(
    db: &Database,
    lexicon: &Lexicon,
    input: R,
) -> Result<IngestReport> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers().context("cannot read CSV header")?.clone();

    let mut batch = Vec::new();
    let mut failed_rows = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let result = row
            .map_err(anyhow::Error::from)
            .and_then(|row| transform_row(&headers, &row, lexicon));
        match result {
            Ok(record) => batch.push(record),
            Err(e) => {
                warn!("skipping row {row_number}: {e:#}");
                failed_rows.push(FailedRow {
                    row: row_number,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    let inserted = batch.len();
    db.insert_reviews(batch).context("bulk insert failed")?;
    info!(inserted, failed = failed_rows.len(), "CSV batch ingested");
    Ok(IngestReport {
        inserted,
        failed_rows,
    })
}

/// Map one raw CSV row into a candidate record: explicit numeric coercion,
/// Yes/No flag handling, closed-vocabulary feedback type, and the three
/// auto-tags. Pure beyond the classifier call.
fn transform_row(
    headers: &StringRecord,
    row: &StringRecord,
    lexicon: &Lexicon,
) -> Result<ReviewRecord> {
    let text = |name: &str| -> Result<&str> {
        headers
            .iter()
            .position(|header| header == name)
            .and_then(|index| row.get(index))
            .with_context(|| format!("missing column `{name}`"))
    };
    let number = |name: &str| -> Result<f64> {
        let raw = text(name)?;
        let value: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {name}: `{raw}`"))?;
        if !value.is_finite() {
            bail!("invalid {name}: `{raw}`");
        }
        Ok(value)
    };

    let review_text = text("Review Text")?.to_string();
    let delivery_time = number("Delivery Time (min)")?;
    let order_accuracy = text("Order Accuracy")?.to_string();
    let feedback = text("Customer Feedback Type")?;
    let customer_feedback_type = FeedbackType::from_label(feedback)
        .with_context(|| format!("invalid Customer Feedback Type: `{feedback}`"))?;

    let tags = tagging::auto_tag(lexicon, &review_text, delivery_time, &order_accuracy);
    let now = Timestamp::now();

    Ok(ReviewRecord {
        agent_name: text("Agent Name")?.to_string(),
        rating: number("Rating")?,
        review_text,
        delivery_time,
        location: text("Location")?.to_string(),
        order_type: text("Order Type")?.to_string(),
        customer_feedback_type,
        price_range: text("Price Range")?.to_string(),
        discount_applied: text("Discount Applied")? == "Yes",
        product_availability: text("Product Availability")?.to_string(),
        customer_service_rating: number("Customer Service Rating")?,
        order_accuracy,
        sentiment: tags.sentiment,
        performance: tags.performance,
        accuracy: tags.accuracy,
        discount_range: None,
        complaint_type: None,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::ingest_csv;
    use crate::{
        database::Database,
        lexicon::Lexicon,
        tagging::{Accuracy, Performance, Sentiment},
    };

    const HEADER: &str = "Agent Name,Rating,Review Text,Delivery Time (min),Location,Order Type,Customer Feedback Type,Price Range,Discount Applied,Product Availability,Customer Service Rating,Order Accuracy";

    fn connect() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        (dir, db)
    }

    fn csv_doc(rows: &[&str]) -> String {
        let mut doc = String::from(HEADER);
        for row in rows {
            doc.push('\n');
            doc.push_str(row);
        }
        doc
    }

    #[test]
    fn valid_rows_are_tagged_and_stored() {
        let (_dir, db) = connect();
        let doc = csv_doc(&[
            "Asha,5,great delicious food,20,Delhi,Grocery,Positive,100-200,Yes,In Stock,5,All correct",
            "Ravi,2,cold and stale and late,75,Mumbai,Snacks,Negative,50-100,No,In Stock,2,Customer reported a mistake",
        ]);

        let report = ingest_csv(&db, &Lexicon::default(), doc.as_bytes()).unwrap();
        assert_eq!(report.inserted, 2);
        assert!(report.failed_rows.is_empty());

        let first = db.review(0).unwrap().unwrap();
        assert_eq!(first.agent_name, "Asha");
        assert_eq!(first.sentiment, Sentiment::Positive);
        assert_eq!(first.performance, Performance::Fast);
        assert_eq!(first.accuracy, Accuracy::OrderAccurate);
        assert!(first.discount_applied);

        let second = db.review(1).unwrap().unwrap();
        assert_eq!(second.sentiment, Sentiment::Negative);
        assert_eq!(second.performance, Performance::Slow);
        assert_eq!(second.accuracy, Accuracy::OrderMistake);
        assert!(!second.discount_applied);
    }

    #[test]
    fn malformed_row_is_skipped_not_fatal() {
        let (_dir, db) = connect();
        let doc = csv_doc(&[
            "Asha,not-a-number,ok,20,Delhi,Grocery,Positive,100-200,Yes,In Stock,5,ok",
            "Ravi,4,ok,20,Delhi,Grocery,Neutral,100-200,No,In Stock,4,ok",
        ]);

        let report = ingest_csv(&db, &Lexicon::default(), doc.as_bytes()).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed_rows.len(), 1);
        assert_eq!(report.failed_rows[0].row, 1);
        assert!(report.failed_rows[0].reason.contains("Rating"));
        assert_eq!(db.review(0).unwrap().unwrap().agent_name, "Ravi");
    }

    #[test]
    fn nan_is_rejected_rather_than_stored() {
        let (_dir, db) = connect();
        let doc = csv_doc(&[
            "Asha,NaN,ok,20,Delhi,Grocery,Positive,100-200,Yes,In Stock,5,ok",
        ]);

        let report = ingest_csv(&db, &Lexicon::default(), doc.as_bytes()).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed_rows.len(), 1);
    }

    #[test]
    fn unknown_feedback_type_fails_the_row() {
        let (_dir, db) = connect();
        let doc = csv_doc(&[
            "Asha,4,ok,20,Delhi,Grocery,Mixed,100-200,Yes,In Stock,5,ok",
        ]);

        let report = ingest_csv(&db, &Lexicon::default(), doc.as_bytes()).unwrap();
        assert_eq!(report.inserted, 0);
        assert!(report.failed_rows[0]
            .reason
            .contains("Customer Feedback Type"));
    }

    #[test]
    fn missing_column_fails_the_row() {
        let (_dir, db) = connect();
        let doc = "Agent Name,Rating\nAsha,4";

        let report = ingest_csv(&db, &Lexicon::default(), doc.as_bytes()).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed_rows.len(), 1);
        assert!(report.failed_rows[0].reason.contains("missing column"));
    }

    #[test]
    fn empty_document_inserts_nothing() {
        let (_dir, db) = connect();
        let report = ingest_csv(&db, &Lexicon::default(), HEADER.as_bytes()).unwrap();
        assert_eq!(report.inserted, 0);
        assert!(report.failed_rows.is_empty());
    }
}
