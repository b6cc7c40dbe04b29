use std::collections::HashMap;

use super::condition::{CompareOp, Condition};
use super::error::QueryError;

/// Query-string keys consumed by the list machinery itself; everything else
/// is treated as a field filter.
const RESERVED_PARAMS: &[&str] = &["select", "sort", "page", "limit"];

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

/// Parsed list-endpoint parameters: filters, projection, sort and paging.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub conditions: Vec<Condition>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: i64,
    pub limit: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            conditions: vec![],
            select: None,
            sort: vec![],
            page: 1,
            limit: crate::config::config().query.default_limit,
        }
    }
}

impl ListParams {
    /// Parse raw query pairs. Reserved keys are stripped first; remaining
    /// keys are either bare columns (equality) or `column[op]` comparisons.
    /// Malformed `page`/`limit` values fall back to defaults without error.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> Result<Self, QueryError> {
        let mut params = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "select" => {
                    let columns: Vec<String> = value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                    if !columns.is_empty() {
                        params.select = Some(columns);
                    }
                }
                "sort" => {
                    params.sort = parse_sort(value);
                }
                "page" => {
                    params.page = parse_lenient(value, 1, 1);
                }
                "limit" => {
                    let default = crate::config::config().query.default_limit;
                    let mut limit = parse_lenient(value, default, 1);
                    if let Some(max) = crate::config::config().query.max_limit {
                        if limit > max {
                            if crate::config::config().query.debug_logging {
                                tracing::warn!("limit {} exceeds max {}, capping", limit, max);
                            }
                            limit = max;
                        }
                    }
                    params.limit = limit;
                }
                _ => {
                    let (column, op) = parse_filter_key(key)?;
                    params.conditions.push(Condition::from_raw(column, op, value));
                }
            }
        }

        Ok(params)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Prepend an equality filter, used by nested routes to scope results to
    /// a parent record.
    pub fn scoped(mut self, condition: Condition) -> Self {
        self.conditions.insert(0, condition);
        self
    }
}

/// Split `column[op]` into its parts; a key without brackets is an equality
/// filter on that column.
fn parse_filter_key(key: &str) -> Result<(String, CompareOp), QueryError> {
    if let Some(open) = key.find('[') {
        if key.ends_with(']') {
            let column = &key[..open];
            let op = &key[open + 1..key.len() - 1];
            return Ok((column.to_string(), CompareOp::from_suffix(op)?));
        }
        return Err(QueryError::UnsupportedOperator(key.to_string()));
    }
    Ok((key.to_string(), CompareOp::Eq))
}

fn parse_sort(value: &str) -> Vec<SortKey> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|token| match token.strip_prefix('-') {
            Some(column) => SortKey { column: column.to_string(), descending: true },
            None => SortKey { column: token.to_string(), descending: false },
        })
        .collect()
}

/// Non-strict numeric parsing: anything unparseable or below `min` falls
/// back to the default.
fn parse_lenient(raw: &str, default: i64, min: i64) -> i64 {
    raw.parse::<i64>().ok().filter(|v| *v >= min).unwrap_or(default)
}
