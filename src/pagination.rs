//! Page windows for grid listings.
//!
//! [`paginate`] fetches one page through sea-orm's paginator and reports the
//! record range shown on it ("Shows: 21 - 40 from 57").

use axum::http::header::HeaderMap;
use sea_orm::{ConnectionTrait, DbErr, PaginatorTrait, SelectorTrait};
use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Page size used when the request does not name one.
pub const DEFAULT_PER_PAGE: u64 = 20;

/// Page request parameters.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number.
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Records per page, 20 when absent.
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Column to sort by.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<String>, example = "name")]
    pub sort: Option<String>,
    /// `asc` or `desc`.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<String>, example = "desc")]
    pub direction: Option<String>,
}

impl PageParams {
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> u64 {
        self.per_page
            .filter(|per_page| *per_page > 0)
            .unwrap_or(DEFAULT_PER_PAGE)
    }
}

/// Record range of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationFields {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    /// 1-based index of the first record on the page
    pub from_record: u64,
    /// 1-based index of the last record on the page
    pub to_record: u64,
}

impl PaginationFields {
    /// Compute the window; page 0 counts as 1 and `per_page` 0 as the default.
    #[must_use]
    pub fn new(current_page: u64, per_page: u64, total: u64) -> Self {
        let current_page = current_page.max(1);
        let per_page = if per_page == 0 { DEFAULT_PER_PAGE } else { per_page };
        let max_on_page = current_page.saturating_mul(per_page);

        Self {
            current_page,
            per_page,
            total,
            last_page: total.div_ceil(per_page).max(1),
            from_record: if current_page > 1 {
                (current_page - 1).saturating_mul(per_page).saturating_add(1)
            } else {
                1
            },
            to_record: total.min(max_on_page),
        }
    }

    #[must_use]
    pub const fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }

    /// `Content-Range: {resource} {from}-{to}/{total}` header for API responses.
    #[must_use]
    pub fn content_range(&self, resource_name: &str) -> HeaderMap {
        let safe_name: String = resource_name
            .chars()
            .filter(|c| c.is_ascii() && !c.is_ascii_control())
            .collect();
        let content_range = format!(
            "{safe_name} {}-{}/{}",
            self.from_record, self.to_record, self.total
        );

        let mut headers = HeaderMap::new();
        if let Ok(value) = content_range.parse() {
            headers.insert("Content-Range", value);
        }
        headers
    }
}

/// One fetched page.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub pagination: PaginationFields,
}

/// Fetch page `page` (1-based) of `select`.
///
/// ```rust,ignore
/// let select = user::Entity::find().filter(condition).order_by(column, order);
/// let page = paginate(select, &db, params.page(), params.per_page()).await?;
/// ```
///
/// # Errors
///
/// Returns the database error from counting or fetching.
pub async fn paginate<'db, C, S>(
    select: S,
    db: &'db C,
    page: u64,
    per_page: u64,
) -> Result<Page<<S::Selector as SelectorTrait>::Item>, DbErr>
where
    C: ConnectionTrait,
    S: PaginatorTrait<'db, C>,
{
    let per_page = if per_page == 0 { DEFAULT_PER_PAGE } else { per_page };
    let paginator = select.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let pagination = PaginationFields::new(page, per_page, total);

    tracing::debug!(
        page = pagination.current_page,
        per_page,
        total,
        "Fetching page"
    );

    // Pages past the end are all empty; fetch the first of them.
    let index = (pagination.current_page - 1).min(pagination.last_page);
    let records = paginator.fetch_page(index).await?;
    Ok(Page {
        records,
        pagination,
    })
}
