//! Recipe listing filter.
//!
//! The three optional request parameters (difficulty, search, sort) are parsed
//! leniently into a [`RecipeFilter`], which then writes one shared predicate
//! into both the page query and the count query. Values are always bound.

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use std::ops::RangeInclusive;
use utoipa::{IntoParams, ToSchema};

pub const RECIPES_PER_PAGE: i64 = 12;
/// Pages shown either side of the current one in the pagination control
pub const PAGE_WINDOW: i64 = 2;

const CARD_COLUMNS: &str = r#"
    SELECT r.id, r.title, r.image_url, r.cooking_time, r.servings, r.difficulty,
           r.created_by, r.created_at,
           u.name AS creator_name,
           u.initials AS creator_initials,
           u.avatar_color AS creator_avatar_color,
           u.profile_picture AS creator_profile_picture
    FROM forge.recipes r
    JOIN forge.users u ON u.id = r.created_by"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Used for writes: anything but a known level is an error
    pub fn parse_strict(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Used for listing filters: "all", blanks and garbage mean no filter
    pub fn parse_filter(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse_strict)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => SortOrder::Oldest,
            Some("title") => SortOrder::Title,
            _ => SortOrder::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Title => "title",
        }
    }

    /// Ties broken by id so paging is stable
    fn order_by(&self) -> &'static str {
        match self {
            SortOrder::Newest => " ORDER BY r.created_at DESC, r.id DESC",
            SortOrder::Oldest => " ORDER BY r.created_at ASC, r.id ASC",
            SortOrder::Title => " ORDER BY LOWER(r.title) ASC, r.id ASC",
        }
    }
}

/// Raw query string of the listing page and its JSON twin
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct RecipeListParams {
    /// Easy, Medium, Hard or all
    pub difficulty: Option<String>,
    /// Substring matched against the title
    pub search: Option<String>,
    /// newest, oldest or title
    pub sort: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
}

impl RecipeListParams {
    /// Requested page; unparsable or non-positive values become 1
    pub fn requested_page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub sort: SortOrder,
}

impl RecipeFilter {
    pub fn from_params(params: &RecipeListParams) -> Self {
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            difficulty: Difficulty::parse_filter(params.difficulty.as_deref()),
            search,
            sort: SortOrder::parse(params.sort.as_deref()),
        }
    }

    /// Whether any predicate narrows the listing. Sorting does not count.
    pub fn is_active(&self) -> bool {
        self.difficulty.is_some() || self.search.is_some()
    }

    fn push_predicates(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        let mut first = true;
        let mut connector = |builder: &mut QueryBuilder<'static, Postgres>| {
            builder.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if let Some(difficulty) = self.difficulty {
            connector(builder);
            builder
                .push("r.difficulty = ")
                .push_bind(difficulty.as_str());
        }

        if let Some(search) = &self.search {
            connector(builder);
            builder
                .push("r.title ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM forge.recipes r");
        self.push_predicates(&mut builder);
        builder
    }

    pub fn page_query(&self, pagination: &Pagination) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(CARD_COLUMNS);
        self.push_predicates(&mut builder);
        builder.push(self.sort.order_by());
        builder
            .push(" LIMIT ")
            .push_bind(pagination.per_page)
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        builder
    }
}

/// Escape LIKE metacharacters so the term matches literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Page is clamped into `1..=total_pages` (page 1 when the listing is empty)
    pub fn new(requested_page: i64, total: i64) -> Self {
        let total = total.max(0);
        let total_pages = (total + RECIPES_PER_PAGE - 1) / RECIPES_PER_PAGE;
        let page = requested_page.max(1).min(total_pages.max(1));

        Self {
            page,
            per_page: RECIPES_PER_PAGE,
            total,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Page numbers rendered around the current page
    pub fn window(&self) -> RangeInclusive<i64> {
        let start = (self.page - PAGE_WINDOW).max(1);
        let end = (self.page + PAGE_WINDOW).min(self.total_pages.max(1));
        start..=end
    }
}
