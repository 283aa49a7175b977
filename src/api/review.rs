use std::collections::BTreeMap;

use async_graphql::{Context, Error, ErrorExtensions, Json, Object, Result, SimpleObject, ID};
use jiff::Timestamp;

use crate::{
    api::{self, DateTimeUtc, Pagination},
    database::{self, review::ReviewRecord, TryFromKeyValue},
    tagging::{Accuracy, FeedbackType, Performance, Sentiment},
    Database,
};

const DEFAULT_PAGE_SIZE: usize = 10;
const ALLOWED_SORT_FIELDS: [&str; 2] = ["createdAt", "updatedAt"];

#[derive(SimpleObject, Default)]
pub(crate) struct Review {
    pub(crate) id: ID,
    #[graphql(skip)]
    pub(crate) key: u64,
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
    pub(crate) discount_range: Option<String>,
    pub(crate) complaint_type: Option<String>,
    pub(crate) created_at: DateTimeUtc,
    pub(crate) updated_at: DateTimeUtc,
}

impl Review {
    fn from_record(key: u64, record: ReviewRecord) -> Self {
        Review {
            id: ID::from(key.to_string()),
            key,
            agent_name: record.agent_name,
            rating: record.rating,
            review_text: record.review_text,
            delivery_time: record.delivery_time,
            location: record.location,
            order_type: record.order_type,
            customer_feedback_type: record.customer_feedback_type,
            price_range: record.price_range,
            discount_applied: record.discount_applied,
            product_availability: record.product_availability,
            customer_service_rating: record.customer_service_rating,
            order_accuracy: record.order_accuracy,
            sentiment: record.sentiment,
            performance: record.performance,
            accuracy: record.accuracy,
            discount_range: record.discount_range,
            complaint_type: record.complaint_type,
            created_at: DateTimeUtc(record.created_at),
            updated_at: DateTimeUtc(record.updated_at),
        }
    }
}

impl TryFromKeyValue for Review {
    fn try_from_key_value(key: &[u8], value: &[u8]) -> anyhow::Result<Self> {
        let key = database::parse_key(key)?;
        let record: ReviewRecord = bincode::deserialize(value)?;
        Ok(Review::from_record(key, record))
    }
}

#[derive(SimpleObject)]
struct ReviewPage {
    data: Vec<Review>,
    pagination: Pagination,
    message: String,
}

#[derive(Default)]
pub(super) struct ReviewQuery;

#[Object]
impl ReviewQuery {
    /// Reviews in stable sort order. `sort` is restricted to `createdAt`
    /// and `updatedAt`; anything else falls back to `createdAt`. The
    /// default order is newest first; pass `order: "asc"` for oldest
    /// first.
    #[allow(clippy::unused_async)]
    async fn reviews(
        &self,
        ctx: &Context<'_>,
        page: Option<i32>,
        limit: Option<i32>,
        sort: Option<String>,
        order: Option<String>,
    ) -> Result<ReviewPage> {
        let db = ctx.data::<Database>()?;
        let mut reviews: Vec<Review> = db
            .reviews(None, None)
            .filter_map(std::result::Result::ok)
            .collect();

        let sort_field = sort
            .as_deref()
            .filter(|field| ALLOWED_SORT_FIELDS.contains(field))
            .unwrap_or("createdAt");
        let ascending = order.as_deref() == Some("asc");
        reviews.sort_by(|a, b| {
            let ordering = match sort_field {
                "updatedAt" => a.updated_at.0.cmp(&b.updated_at.0),
                _ => a.created_at.0.cmp(&b.created_at.0),
            }
            .then_with(|| a.key.cmp(&b.key));
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        let (page, limit) = api::page_bounds(page, limit, DEFAULT_PAGE_SIZE);
        let total = reviews.len();
        let data: Vec<Review> = reviews
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();
        let message = if data.is_empty() {
            "No reviews found"
        } else {
            "Reviews retrieved successfully"
        }
        .to_string();

        Ok(ReviewPage {
            data,
            pagination: Pagination::new(total, page, limit),
            message,
        })
    }
}

/// The editable tag fields of one review, already validated against the
/// closed vocabularies.
#[derive(Debug, Default, PartialEq, Eq)]
struct TagPatch {
    sentiment: Option<Sentiment>,
    accuracy: Option<Accuracy>,
    performance: Option<Performance>,
    customer_feedback_type: Option<FeedbackType>,
}

impl TagPatch {
    /// Whitelist-and-validate a free-form field map. Keys outside the
    /// editable tag set are silently dropped; every invalid value is
    /// collected, and any violation rejects the whole patch.
    fn from_fields(fields: &BTreeMap<String, String>) -> std::result::Result<Self, Vec<String>> {
        let mut patch = TagPatch::default();
        let mut violations = Vec::new();
        for (field, value) in fields {
            let valid = match field.as_str() {
                "sentiment" => match Sentiment::from_label(value) {
                    Some(sentiment) => {
                        patch.sentiment = Some(sentiment);
                        true
                    }
                    None => false,
                },
                // Manual edits use the two-value accuracy vocabulary; the
                // classifier-only "Order Mistake" label is not accepted here.
                "accuracy" => match value.as_str() {
                    "Order Accurate" => {
                        patch.accuracy = Some(Accuracy::OrderAccurate);
                        true
                    }
                    "Incorrect" => {
                        patch.accuracy = Some(Accuracy::Incorrect);
                        true
                    }
                    _ => false,
                },
                "performance" => match Performance::from_label(value) {
                    Some(performance) => {
                        patch.performance = Some(performance);
                        true
                    }
                    None => false,
                },
                "customerFeedbackType" => match FeedbackType::from_label(value) {
                    Some(feedback) => {
                        patch.customer_feedback_type = Some(feedback);
                        true
                    }
                    None => false,
                },
                _ => continue,
            };
            if !valid {
                violations.push(format!("Invalid value '{value}' for field '{field}'"));
            }
        }
        if violations.is_empty() {
            Ok(patch)
        } else {
            Err(violations)
        }
    }

    fn apply(&self, record: &mut ReviewRecord) {
        if let Some(sentiment) = self.sentiment {
            record.sentiment = sentiment;
        }
        if let Some(accuracy) = self.accuracy {
            record.accuracy = accuracy;
        }
        if let Some(performance) = self.performance {
            record.performance = performance;
        }
        if let Some(feedback) = self.customer_feedback_type {
            record.customer_feedback_type = feedback;
        }
    }
}

fn not_found() -> Error {
    Error::new("Review not found").extend_with(|_, e| e.set("code", "NOT_FOUND"))
}

fn storage_error(e: anyhow::Error) -> Error {
    Error::new(format!("{e:#}")).extend_with(|_, e| e.set("code", "STORAGE"))
}

#[derive(Default)]
pub(super) struct ReviewMutation;

#[Object]
impl ReviewMutation {
    /// Update the editable tags of one review. Unknown keys in `fields`
    /// are dropped; invalid values reject the whole update.
    #[allow(clippy::unused_async)]
    async fn update_review_tags(
        &self,
        ctx: &Context<'_>,
        id: ID,
        fields: Json<BTreeMap<String, String>>,
    ) -> Result<Review> {
        let db = ctx.data::<Database>()?;
        let patch = TagPatch::from_fields(&fields.0).map_err(|violations| {
            Error::new(format!("Validation failed: {}", violations.join("; ")))
                .extend_with(|_, e| e.set("code", "VALIDATION"))
        })?;

        let key: u64 = id.parse().map_err(|_| not_found())?;
        let mut record = db.review(key).map_err(storage_error)?.ok_or_else(not_found)?;
        patch.apply(&mut record);
        record.updated_at = Timestamp::now();
        db.update_review(key, &record).map_err(storage_error)?;
        Ok(Review::from_record(key, record))
    }
}
