use serde_json::Value;

use super::error::QueryError;
use super::params::{ListParams, SortKey};

/// A parent relation embedded into each row as a JSON object, rendered as a
/// correlated subquery (`.populate()` in the original API's terms).
#[derive(Debug, Clone)]
pub struct Embed {
    pub table: String,
    pub fk_column: String,
    pub fields: Vec<String>,
    pub alias: String,
}

impl Embed {
    pub fn new(
        table: impl Into<String>,
        fk_column: impl Into<String>,
        fields: &[&str],
        alias: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            fk_column: fk_column.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            alias: alias.into(),
        }
    }
}

/// Rendered SQL plus its positional bind values.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Builds the paged list query for one table out of parsed [`ListParams`].
///
/// Rows are fetched as `row_to_json` objects so the `select` projection can
/// narrow columns without a fixed row type.
#[derive(Debug, Clone)]
pub struct ListQuery {
    table: String,
    params: ListParams,
    embed: Option<Embed>,
    paginate: bool,
}

impl ListQuery {
    pub fn new(table: impl Into<String>, params: ListParams) -> Result<Self, QueryError> {
        let table = table.into();
        validate_identifier(&table).map_err(|_| QueryError::InvalidTableName(table.clone()))?;
        for cond in &params.conditions {
            validate_identifier(&cond.column)?;
        }
        if let Some(select) = &params.select {
            for column in select {
                validate_identifier(column)?;
            }
        }
        for key in &params.sort {
            validate_identifier(&key.column)?;
        }
        Ok(Self { table, params, embed: None, paginate: true })
    }

    pub fn embed(mut self, embed: Embed) -> Result<Self, QueryError> {
        validate_identifier(&embed.table).map_err(|_| QueryError::InvalidTableName(embed.table.clone()))?;
        validate_identifier(&embed.fk_column)?;
        validate_identifier(&embed.alias)?;
        for field in &embed.fields {
            validate_identifier(field)?;
        }
        self.embed = Some(embed);
        Ok(self)
    }

    /// Drop the LIMIT/OFFSET clause; nested parent-scoped listings return the
    /// full child set.
    pub fn unpaginated(mut self) -> Self {
        self.paginate = false;
        self
    }

    pub fn page(&self) -> i64 {
        self.params.page
    }

    pub fn limit(&self) -> i64 {
        self.params.limit
    }

    /// Render the row query: a `row_to_json` wrapper over the projected,
    /// filtered, ordered, paged subselect.
    pub fn to_sql(&self) -> SqlQuery {
        let mut params = vec![];
        let where_clause = self.render_where(&mut params);

        let mut select_list = match &self.params.select {
            Some(columns) => columns
                .iter()
                .map(|c| format!("\"{}\".\"{}\"", self.table, c))
                .collect::<Vec<_>>()
                .join(", "),
            None => format!("\"{}\".*", self.table),
        };
        if let Some(embed) = &self.embed {
            select_list.push_str(&format!(", {}", render_embed(&self.table, embed)));
        }

        let mut parts = vec![
            format!("SELECT {}", select_list),
            format!("FROM \"{}\"", self.table),
        ];
        if !where_clause.is_empty() {
            parts.push(format!("WHERE {}", where_clause));
        }
        parts.push(self.render_order());
        if self.paginate {
            parts.push(format!("LIMIT {} OFFSET {}", self.params.limit, self.params.offset()));
        }

        let inner = parts.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");
        SqlQuery { sql: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner), params }
    }

    /// Render the matching-set count query (same WHERE, no paging).
    pub fn to_count_sql(&self) -> SqlQuery {
        let mut params = vec![];
        let where_clause = self.render_where(&mut params);
        let sql = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table, where_clause)
        };
        SqlQuery { sql, params }
    }

    fn render_where(&self, params: &mut Vec<Value>) -> String {
        self.params
            .conditions
            .iter()
            .map(|c| c.to_sql(params))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn render_order(&self) -> String {
        let mut keys: Vec<String> = self
            .params
            .sort
            .iter()
            .map(|SortKey { column, descending }| {
                format!("\"{}\" {}", column, if *descending { "DESC" } else { "ASC" })
            })
            .collect();
        if keys.is_empty() {
            // Default ordering is newest first
            keys.push("\"created_at\" DESC".to_string());
        }
        // id tiebreak keeps page windows stable when the sort key repeats
        keys.push("\"id\" ASC".to_string());
        format!("ORDER BY {}", keys.join(", "))
    }
}

fn render_embed(table: &str, embed: &Embed) -> String {
    let fields = embed
        .fields
        .iter()
        .map(|f| format!("'{}', e.\"{}\"", f, f))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "(SELECT json_build_object({fields}) FROM \"{parent}\" e WHERE e.\"id\" = \"{table}\".\"{fk}\") AS \"{alias}\"",
        fields = fields,
        parent = embed.table,
        table = table,
        fk = embed.fk_column,
        alias = embed.alias,
    )
}

/// Identifiers are double-quoted in rendered SQL; restricting them to
/// `[A-Za-z_][A-Za-z0-9_]*` keeps client-supplied column names inert.
pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::condition::{CompareOp, Condition};
    use serde_json::json;
    use std::collections::HashMap;

    fn params_from(entries: &[(&str, &str)]) -> ListParams {
        let map: HashMap<String, String> =
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ListParams::from_pairs(&map).unwrap()
    }

    #[test]
    fn bare_listing_defaults_to_created_at_desc_with_id_tiebreak() {
        let query = ListQuery::new("bootcamps", params_from(&[])).unwrap();
        let rendered = query.to_sql();
        assert_eq!(
            rendered.sql,
            "SELECT row_to_json(t) AS row FROM (SELECT \"bootcamps\".* FROM \"bootcamps\" \
             ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT 25 OFFSET 0) t"
        );
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn filters_render_as_bound_where_clauses() {
        let query =
            ListQuery::new("courses", params_from(&[("tuition[gt]", "100"), ("page", "2"), ("limit", "10")]))
                .unwrap();
        let rendered = query.to_sql();
        assert!(rendered.sql.contains("WHERE \"tuition\" > $1"));
        assert!(rendered.sql.contains("LIMIT 10 OFFSET 10"));
        assert_eq!(rendered.params, vec![json!(100)]);
    }

    #[test]
    fn select_projects_only_named_columns() {
        let query = ListQuery::new("bootcamps", params_from(&[("select", "name,description")])).unwrap();
        let rendered = query.to_sql();
        assert!(rendered.sql.contains("SELECT \"bootcamps\".\"name\", \"bootcamps\".\"description\" FROM"));
        assert!(!rendered.sql.contains("\"bootcamps\".*"));
    }

    #[test]
    fn count_query_shares_where_and_skips_paging() {
        let query = ListQuery::new("courses", params_from(&[("tuition[lte]", "5000"), ("limit", "2")])).unwrap();
        let rendered = query.to_count_sql();
        assert_eq!(rendered.sql, "SELECT COUNT(*) AS count FROM \"courses\" WHERE \"tuition\" <= $1");
        assert_eq!(rendered.params, vec![json!(5000)]);
    }

    #[test]
    fn scoped_condition_binds_before_client_filters() {
        let params = params_from(&[("rating[gte]", "8")])
            .scoped(Condition::eq("bootcamp_id", json!("b-1")));
        let query = ListQuery::new("reviews", params).unwrap();
        let rendered = query.to_sql();
        assert!(rendered.sql.contains("WHERE \"bootcamp_id\" = $1 AND \"rating\" >= $2"));
        assert_eq!(rendered.params, vec![json!("b-1"), json!(8)]);
    }

    #[test]
    fn embed_adds_correlated_json_object() {
        let query = ListQuery::new("courses", params_from(&[]))
            .unwrap()
            .embed(Embed::new("bootcamps", "bootcamp_id", &["id", "name", "description"], "bootcamp"))
            .unwrap();
        let rendered = query.to_sql();
        assert!(rendered.sql.contains(
            "(SELECT json_build_object('id', e.\"id\", 'name', e.\"name\", 'description', e.\"description\") \
             FROM \"bootcamps\" e WHERE e.\"id\" = \"courses\".\"bootcamp_id\") AS \"bootcamp\""
        ));
    }

    #[test]
    fn unpaginated_query_has_no_limit_clause() {
        let query = ListQuery::new("courses", params_from(&[])).unwrap().unpaginated();
        assert!(!query.to_sql().sql.contains("LIMIT"));
    }

    #[test]
    fn hostile_identifiers_are_rejected() {
        assert!(validate_identifier("name; DROP TABLE users").is_err());
        assert!(validate_identifier("\"quoted\"").is_err());
        assert!(validate_identifier("1starts_with_digit").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("average_cost").is_ok());
    }

    #[test]
    fn hostile_filter_column_fails_query_construction() {
        let params = ListParams::default()
            .scoped(Condition::new("id\" OR 1=1 --", CompareOp::Eq, json!(1)));
        assert!(ListQuery::new("bootcamps", params).is_err());
    }
}
