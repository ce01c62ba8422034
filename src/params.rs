//! Pagination parameter normalization
//!
//! Backends disagree on how a page is addressed: some take `offset`/`limit`, others
//! `page`/`size`. [`PaginationParams`] carries both shapes for the same logical page
//! so a page provider can pick whichever its endpoint consumes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter bag handed to a page provider for one page request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Number of items to skip
    pub offset: u64,
    /// Number of items to return (offset style)
    pub limit: u64,
    /// 1-based page number
    pub page: u64,
    /// Number of items per page (page style)
    pub size: u64,
    /// Caller supplied static filters, merged into the serialized bag
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl PaginationParams {
    /// Build the parameters for the zero-based `page_index`.
    ///
    /// `offset = page_index * page_size` and `page = offset / page_size + 1`.
    pub fn for_page(page_index: u64, page_size: u64, filters: &Map<String, Value>) -> Self {
        let offset = page_index.saturating_mul(page_size);
        let page = offset
            .checked_div(page_size)
            .unwrap_or(page_index)
            .saturating_add(1);

        Self {
            offset,
            limit: page_size,
            page,
            size: page_size,
            filters: filters.clone(),
        }
    }

    /// Zero-based index of the page these parameters address
    pub fn page_index(&self) -> u64 {
        self.page.saturating_sub(1)
    }

    /// Look up a static filter by name
    pub fn filter(&self, name: &str) -> Option<&Value> {
        self.filters.get(name)
    }

    /// Render the bag as string pairs, e.g. for a URL query string.
    ///
    /// Filter strings are emitted without quotes; null filters are skipped.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("offset".to_string(), self.offset.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ];
        for (name, value) in &self.filters {
            let rendered = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            pairs.push((name.clone(), rendered));
        }
        pairs
    }
}
