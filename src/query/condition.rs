use serde_json::Value;

use super::error::QueryError;

/// Comparison operators accepted as `field[op]=value` suffixes.
///
/// Conditions are structured data rather than rewritten query text, so a
/// column that happens to be named `gte` is just a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl CompareOp {
    pub fn from_suffix(op: &str) -> Result<Self, QueryError> {
        Ok(match op {
            "gt" => CompareOp::Gt,
            "gte" => CompareOp::Gte,
            "lt" => CompareOp::Lt,
            "lte" => CompareOp::Lte,
            "in" => CompareOp::In,
            other => return Err(QueryError::UnsupportedOperator(other.to_string())),
        })
    }

    fn sql_operator(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::In => "IN",
        }
    }
}

/// One field filter: `column <op> value`.
#[derive(Debug, Clone)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self { column: column.into(), op, value }
    }

    /// Equality condition with an already-typed value, used by handlers to
    /// scope a listing to a parent record.
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, CompareOp::Eq, value)
    }

    /// Parse a raw query-string value for the given operator. `in` splits on
    /// commas into a list; scalars are type-sniffed before binding.
    pub fn from_raw(column: impl Into<String>, op: CompareOp, raw: &str) -> Self {
        let value = match op {
            CompareOp::In => Value::Array(raw.split(',').map(|s| sniff_scalar(s.trim())).collect()),
            _ => sniff_scalar(raw),
        };
        Self::new(column, op, value)
    }

    /// Render as a SQL fragment, pushing bind values onto `params`.
    /// Placeholders continue from the current length of `params`.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let quoted = format!("\"{}\"", self.column);
        match (&self.op, &self.value) {
            (CompareOp::Eq, Value::Null) => format!("{} IS NULL", quoted),
            (CompareOp::In, Value::Array(values)) => {
                if values.is_empty() {
                    // IN over nothing matches nothing
                    return "1=0".to_string();
                }
                let placeholders: Vec<String> =
                    values.iter().map(|v| push_param(params, v.clone())).collect();
                format!("{} IN ({})", quoted, placeholders.join(", "))
            }
            (op, value) => {
                let placeholder = push_param(params, value.clone());
                format!("{} {} {}", quoted, op.sql_operator(), placeholder)
            }
        }
    }
}

fn push_param(params: &mut Vec<Value>, value: Value) -> String {
    params.push(value);
    format!("${}", params.len())
}

/// Best-effort scalar typing so numeric filters bind as numbers.
/// Everything that isn't an integer, float, or boolean stays a string.
pub fn sniff_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_sniffing_prefers_numbers() {
        assert_eq!(sniff_scalar("100"), json!(100));
        assert_eq!(sniff_scalar("10.5"), json!(10.5));
        assert_eq!(sniff_scalar("true"), json!(true));
        assert_eq!(sniff_scalar("Business"), json!("Business"));
    }

    #[test]
    fn gt_renders_with_positional_param() {
        let cond = Condition::from_raw("tuition", CompareOp::Gt, "100");
        let mut params = vec![];
        assert_eq!(cond.to_sql(&mut params), "\"tuition\" > $1");
        assert_eq!(params, vec![json!(100)]);
    }

    #[test]
    fn in_splits_commas_and_expands_placeholders() {
        let cond = Condition::from_raw("careers", CompareOp::In, "Business,UI/UX");
        let mut params = vec![];
        assert_eq!(cond.to_sql(&mut params), "\"careers\" IN ($1, $2)");
        assert_eq!(params, vec![json!("Business"), json!("UI/UX")]);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let cond = Condition::new("id", CompareOp::In, json!([]));
        let mut params = vec![];
        assert_eq!(cond.to_sql(&mut params), "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn placeholders_continue_from_existing_params() {
        let mut params = vec![json!("already-bound")];
        let cond = Condition::from_raw("rating", CompareOp::Lte, "8");
        assert_eq!(cond.to_sql(&mut params), "\"rating\" <= $2");
    }

    #[test]
    fn column_named_like_an_operator_is_untouched() {
        // A field literally named "gte" filters as a normal column
        let cond = Condition::from_raw("gte", CompareOp::Eq, "7");
        let mut params = vec![];
        assert_eq!(cond.to_sql(&mut params), "\"gte\" = $1");
    }

    #[test]
    fn unknown_suffix_is_rejected() {
        assert!(CompareOp::from_suffix("regex").is_err());
        assert!(CompareOp::from_suffix("gt ").is_err());
    }
}
