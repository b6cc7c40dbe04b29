use serde::Serialize;

/// One page pointer in the pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: i64,
    pub limit: i64,
}

/// Pagination metadata for a list response. `next`/`prev` are present only
/// when records exist beyond/before the current window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl Pagination {
    pub fn compute(page: i64, limit: i64, total: i64) -> Self {
        let start_index = (page - 1) * limit;
        let next = if start_index + limit < total {
            Some(PageRef { page: page + 1, limit })
        } else {
            None
        };
        let prev = if start_index > 0 {
            Some(PageRef { page: page - 1, limit })
        } else {
            None
        };
        Self { next, prev }
    }
}
