use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use async_graphql::{Context, InputObject, Object, Result, SimpleObject};
use indexmap::IndexMap;
use num_traits::ToPrimitive;

use crate::{
    api::{self, review::Review, Pagination},
    database::Iter,
    settings::MetricsScope,
    tagging::FeedbackType,
    Database,
};

/// The default page size for the metrics view when `limit` is not provided.
const DEFAULT_PAGE_SIZE: usize = 100;
const RANKING_SIZE: usize = 3;
const EXCERPT_LENGTH: usize = 50;
const EXAMPLES_PER_COMPLAINT: usize = 2;

#[derive(InputObject, Debug)]
pub(crate) struct MetricsFilter {
    /// Filter by store location. (exact match)
    location: Option<String>,
    /// Filter by order type. (exact match)
    order_type: Option<String>,
    /// Filter by customer service rating. (exact match)
    service_rating: Option<f64>,
}

impl MetricsFilter {
    fn filter_reviews(&self, reviews: Iter<Review>) -> Vec<Review> {
        reviews
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|review| {
                self.location
                    .as_ref()
                    .is_none_or(|location| review.location == *location)
                    && self
                        .order_type
                        .as_ref()
                        .is_none_or(|order_type| review.order_type == *order_type)
                    && self
                        .service_rating
                        .is_none_or(|rating| review.customer_service_rating == rating)
            })
            .collect()
    }
}

#[derive(SimpleObject, Debug)]
struct LocationRating {
    location: String,
    avg_rating: f64,
}

#[derive(SimpleObject, Debug)]
struct AgentRating {
    agent_name: String,
    rating: f64,
}

#[derive(SimpleObject, Debug)]
struct RangeCount {
    range: String,
    count: usize,
}

#[derive(SimpleObject, Debug)]
struct ComplaintCluster {
    #[graphql(name = "type")]
    complaint_type: String,
    count: usize,
    example: String,
}

#[derive(SimpleObject)]
struct DashboardMetrics {
    /// Records in the aggregated slice.
    total_orders: usize,

    /// Mean rating over the slice; 0.0 on empty input.
    average_rating: f64,

    /// The number of distinct agent names.
    active_agents: usize,

    /// Mean rating per location, in first-seen order.
    avg_ratings_per_location: Vec<LocationRating>,

    /// The three best-rated agents, best first; ties break by name.
    top_agents: Vec<AgentRating>,

    /// The three worst-rated agents, worst first; ties break by name.
    bottom_agents: Vec<AgentRating>,

    /// Negative-feedback records with non-empty review text.
    complaints: usize,

    /// Order counts per price range, numeric ranges first.
    price_range_orders: Vec<RangeCount>,

    /// Order counts per discount range, lexicographic.
    discount_distribution: Vec<RangeCount>,

    /// Complaint clusters by type, most frequent first.
    common_complaints: Vec<ComplaintCluster>,
}

#[derive(SimpleObject)]
struct DashboardMetricsResult {
    #[graphql(flatten)]
    metrics: DashboardMetrics,
    pagination: Pagination,
}

#[derive(Default)]
pub(super) struct ReviewStatQuery {}

#[Object]
impl ReviewStatQuery {
    /// Dashboard metrics over the filtered reviews, newest first. Whether
    /// aggregation covers the fetched page or the whole filtered set is
    /// the `metrics_scope` setting; under the page scope the numbers
    /// describe the current page only.
    #[allow(clippy::unused_async)]
    async fn dashboard_metrics(
        &self,
        ctx: &Context<'_>,
        filter: MetricsFilter,
        page: Option<i32>,
        limit: Option<i32>,
    ) -> Result<DashboardMetricsResult> {
        let db = ctx.data::<Database>()?;
        let scope = *ctx.data::<MetricsScope>()?;
        let mut filtered = filter.filter_reviews(db.reviews(None, None));
        filtered.sort_by(|a, b| {
            b.created_at
                .0
                .cmp(&a.created_at.0)
                .then_with(|| b.key.cmp(&a.key))
        });

        let (page, limit) = api::page_bounds(page, limit, DEFAULT_PAGE_SIZE);
        let pagination = Pagination::new(filtered.len(), page, limit);
        let records = match scope {
            MetricsScope::Page => api::page_slice(&filtered, page, limit),
            MetricsScope::Filtered => &filtered[..],
        };

        Ok(DashboardMetricsResult {
            metrics: calculate_metrics(records),
            pagination,
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    count.to_f64().map_or(0.0, |count| total / count)
}

/// Leading decimal digits of a histogram key, if any.
fn integer_prefix(key: &str) -> Option<i64> {
    let digits: String = key.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn excerpt(text: &str) -> String {
    let head: String = text.chars().take(EXCERPT_LENGTH).collect();
    format!("{head}...")
}

/// Compute the full metrics bundle over one slice of reviews.
fn calculate_metrics(records: &[Review]) -> DashboardMetrics {
    let total_orders = records.len();
    let rating_sum: f64 = records.iter().map(|review| review.rating).sum();
    let average_rating = mean(rating_sum, total_orders);
    let active_agents = records
        .iter()
        .map(|review| review.agent_name.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut location_ratings: IndexMap<&str, (f64, usize)> = IndexMap::new();
    for review in records {
        let entry = location_ratings
            .entry(review.location.as_str())
            .or_insert((0.0, 0));
        entry.0 += review.rating;
        entry.1 += 1;
    }
    let avg_ratings_per_location = location_ratings
        .iter()
        .map(|(location, (total, count))| LocationRating {
            location: (*location).to_string(),
            avg_rating: round1(mean(*total, *count)),
        })
        .collect();

    let mut agent_ratings: IndexMap<&str, (f64, usize)> = IndexMap::new();
    for review in records {
        let entry = agent_ratings
            .entry(review.agent_name.as_str())
            .or_insert((0.0, 0));
        entry.0 += review.rating;
        entry.1 += 1;
    }
    let mut agent_means: Vec<(&str, f64)> = agent_ratings
        .iter()
        .map(|(agent, (total, count))| (*agent, mean(*total, *count)))
        .collect();
    agent_means.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    let top_agents = agent_means
        .iter()
        .take(RANKING_SIZE)
        .map(|(agent, rating)| AgentRating {
            agent_name: (*agent).to_string(),
            rating: round1(*rating),
        })
        .collect();
    agent_means.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    let bottom_agents = agent_means
        .iter()
        .take(RANKING_SIZE)
        .map(|(agent, rating)| AgentRating {
            agent_name: (*agent).to_string(),
            rating: round1(*rating),
        })
        .collect();

    let complaint_records: Vec<&Review> = records
        .iter()
        .filter(|review| {
            review.customer_feedback_type == FeedbackType::Negative
                && !review.review_text.is_empty()
        })
        .collect();
    let complaints = complaint_records.len();

    let mut price_ranges: IndexMap<&str, usize> = IndexMap::new();
    for review in records {
        let range = if review.price_range.is_empty() {
            "Unknown"
        } else {
            review.price_range.as_str()
        };
        *price_ranges.entry(range).or_insert(0) += 1;
    }
    let mut price_entries: Vec<(Option<i64>, usize, &str, usize)> = price_ranges
        .iter()
        .enumerate()
        .map(|(position, (range, count))| (integer_prefix(range), position, *range, *count))
        .collect();
    // numeric ranges sort by value; the rest keep discovery order after them
    price_entries.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.1.cmp(&b.1),
    });
    let price_range_orders = price_entries
        .into_iter()
        .map(|(_, _, range, count)| RangeCount {
            range: range.to_string(),
            count,
        })
        .collect();

    let discount_distribution = records
        .iter()
        .fold(BTreeMap::new(), |mut acc, review| {
            let range = review
                .discount_range
                .as_deref()
                .filter(|range| !range.is_empty())
                .unwrap_or("No Discount");
            *acc.entry(range).or_insert(0) += 1;
            acc
        })
        .into_iter()
        .map(|(range, count)| RangeCount {
            range: range.to_string(),
            count,
        })
        .collect();

    let mut clusters: IndexMap<&str, (usize, Vec<String>)> = IndexMap::new();
    for review in &complaint_records {
        let complaint_type = review
            .complaint_type
            .as_deref()
            .filter(|complaint_type| !complaint_type.is_empty())
            .unwrap_or("General Complaint");
        let entry = clusters.entry(complaint_type).or_insert((0, Vec::new()));
        entry.0 += 1;
        if entry.1.len() < EXAMPLES_PER_COMPLAINT {
            entry.1.push(excerpt(&review.review_text));
        }
    }
    let mut common_complaints: Vec<ComplaintCluster> = clusters
        .into_iter()
        .map(|(complaint_type, (count, mut examples))| ComplaintCluster {
            complaint_type: complaint_type.to_string(),
            count,
            example: examples.swap_remove(0),
        })
        .collect();
    common_complaints.sort_by(|a, b| b.count.cmp(&a.count));

    DashboardMetrics {
        total_orders,
        average_rating,
        active_agents,
        avg_ratings_per_location,
        top_agents,
        bottom_agents,
        complaints,
        price_range_orders,
        discount_distribution,
        common_complaints,
    }
}
