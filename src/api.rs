pub(crate) mod review;
mod review_stat;

use async_graphql::{
    EmptySubscription, InputValueError, InputValueResult, MergedObject, Scalar, ScalarType,
    SimpleObject, Value,
};
use jiff::Timestamp;

use crate::{database::Database, settings::MetricsScope};

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(review::ReviewQuery, review_stat::ReviewStatQuery);

#[derive(Default, MergedObject)]
pub(crate) struct Mutation(review::ReviewMutation);

pub(crate) type Schema = async_graphql::Schema<Query, Mutation, EmptySubscription>;

#[derive(Debug, Default, PartialEq, PartialOrd, Clone, Copy)]
pub(crate) struct DateTimeUtc(pub(crate) Timestamp);

#[Scalar]
impl ScalarType for DateTimeUtc {
    fn parse(value: Value) -> InputValueResult<Self> {
        match &value {
            Value::String(s) => Ok(DateTimeUtc(s.parse()?)),
            _ => Err(InputValueError::expected_type(value)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_string())
    }
}

/// Offset-based pagination block returned alongside every paged response.
#[derive(SimpleObject)]
pub(crate) struct Pagination {
    /// Records matching the query across all pages.
    pub(crate) total: usize,
    pub(crate) page: usize,
    pub(crate) limit: usize,
    pub(crate) total_pages: usize,
    pub(crate) has_next_page: bool,
}

impl Pagination {
    pub(crate) fn new(total: usize, page: usize, limit: usize) -> Self {
        Pagination {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
            has_next_page: page.saturating_mul(limit) < total,
        }
    }
}

/// Normalize raw paging arguments: pages below 1 degrade to 1, and a
/// missing or non-positive limit takes the endpoint default.
pub(crate) fn page_bounds(
    page: Option<i32>,
    limit: Option<i32>,
    default_limit: usize,
) -> (usize, usize) {
    let page = page
        .and_then(|p| usize::try_from(p).ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = limit
        .and_then(|l| usize::try_from(l).ok())
        .filter(|l| *l >= 1)
        .unwrap_or(default_limit);
    (page, limit)
}

pub(crate) fn page_slice<T>(items: &[T], page: usize, limit: usize) -> &[T] {
    let skip = (page - 1).saturating_mul(limit);
    if skip >= items.len() {
        &[]
    } else {
        &items[skip..skip.saturating_add(limit).min(items.len())]
    }
}

pub(crate) fn schema(database: Database, metrics_scope: MetricsScope) -> Schema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(database)
        .data(metrics_scope)
        .finish()
}

#[cfg(test)]
struct TestSchema {
    _dir: tempfile::TempDir, // to prevent the data directory from being deleted while the test is running
    db: Database,
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    fn new() -> Self {
        Self::with_scope(MetricsScope::Page)
    }

    fn with_scope(metrics_scope: MetricsScope) -> Self {
        let db_dir = tempfile::tempdir().unwrap();
        let db = Database::connect(db_dir.path()).unwrap();
        let schema = schema(db.clone(), metrics_scope);
        Self {
            _dir: db_dir,
            db,
            schema,
        }
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        let request: async_graphql::Request = query.into();
        self.schema.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::{page_bounds, page_slice, Pagination};

    #[test]
    fn page_bounds_defaults() {
        assert_eq!(page_bounds(None, None, 10), (1, 10));
        assert_eq!(page_bounds(Some(0), Some(0), 10), (1, 10));
        assert_eq!(page_bounds(Some(-3), Some(-1), 10), (1, 10));
        assert_eq!(page_bounds(Some(2), Some(25), 10), (2, 25));
    }

    #[test]
    fn pagination_block() {
        let pagination = Pagination::new(25, 2, 10);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next_page);

        let last = Pagination::new(25, 3, 10);
        assert!(!last.has_next_page);

        let empty = Pagination::new(0, 1, 10);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
    }

    #[test]
    fn page_slice_bounds() {
        let items: Vec<u32> = (0..25).collect();
        assert_eq!(page_slice(&items, 1, 10).len(), 10);
        assert_eq!(page_slice(&items, 3, 10).len(), 5);
        assert!(page_slice(&items, 4, 10).is_empty());
    }
}
