use serde::{Deserialize, Serialize};

use super::Gender;

/// Page size used when the caller does not choose one.
pub const DEFAULT_PAGE_LIMIT: u32 = 12;

/// Transient list filter shared by the image and note listings.
///
/// Empty strings and unset fields are stripped before the filter reaches the
/// query string (see `api::query`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub gender: Option<Gender>,
    pub class: Option<String>,
    pub age: Option<String>,
    pub race: Option<String>,
    pub culture: Option<String>,
    pub uploader_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Filter {
    /// Set a field by its wire name.
    ///
    /// Returns false for unknown keys and for values that do not parse
    /// (`gender`, `uploaderId`); the filter is left unchanged then.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let value = value.to_string();
        match key {
            "gender" => match value.parse() {
                Ok(gender) => self.gender = Some(gender),
                Err(_) => return false,
            },
            "class" => self.class = Some(value),
            "age" => self.age = Some(value),
            "race" => self.race = Some(value),
            "culture" => self.culture = Some(value),
            "uploaderId" | "uploader" => match value.trim().parse() {
                Ok(id) => self.uploader_id = Some(id),
                Err(_) => return false,
            },
            "name" => self.name = Some(value),
            "description" => self.description = Some(value),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default)]
    pub filter: Filter,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort: None,
            order: None,
            filter: Filter::default(),
        }
    }
}

impl Pagination {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Response envelope of the paginated list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
}

impl<T> Paginated<T> {
    pub fn page_count(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.limit))
    }

    /// Whether a paginator is worth showing at all
    pub fn has_more_pages(&self) -> bool {
        self.page_count() > 1
    }
}
