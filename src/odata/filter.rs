//! `$filter` evaluation for the mock OData V2 endpoint.
//!
//! Supports the subset SmartTable emits: `substringof`, `contains`,
//! `startswith`, and the six comparison operators, joined with `and`.
//! Clauses that do not match the grammar are treated as always true so an
//! exotic filter degrades to "show everything" instead of an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;

static SUBSTRINGOF_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^substringof\('((?:''|[^'])*)',\s*([A-Za-z_][A-Za-z0-9_]*)\)$")
        .expect("Invalid substringof regex")
});

static CONTAINS_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^contains\(([A-Za-z_][A-Za-z0-9_]*),\s*'((?:''|[^'])*)'\)$")
        .expect("Invalid contains regex")
});

static STARTSWITH_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^startswith\(([A-Za-z_][A-Za-z0-9_]*),\s*'((?:''|[^'])*)'\)$")
        .expect("Invalid startswith regex")
});

static COMPARISON_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Za-z_][A-Za-z0-9_]*)\s+(eq|ne|gt|ge|lt|le)\s+(.+)$")
        .expect("Invalid comparison regex")
});

static AND_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+and\s+").expect("Invalid and separator regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            _ => None,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

/// Right-hand side of a comparison after literal parsing.
#[derive(Debug, Clone, PartialEq)]
enum FilterLiteral {
    Text(String),
    Bool(bool),
    Null,
    Number(f64),
}

impl FilterLiteral {
    fn to_number(&self) -> Option<f64> {
        match self {
            Self::Text(text) => string_to_number(text),
            Self::Bool(_) => None,
            Self::Null => Some(0.0),
            Self::Number(value) => Some(*value),
        }
    }

    fn to_lower_string(&self) -> String {
        match self {
            Self::Text(text) => text.to_lowercase(),
            Self::Bool(flag) => flag.to_string(),
            Self::Null => String::new(),
            Self::Number(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterClause {
    /// `substringof('needle', Field)` and `contains(Field, 'needle')`.
    Contains { field: String, needle: String },
    StartsWith { field: String, needle: String },
    Comparison {
        field: String,
        op: ComparisonOp,
        literal: FilterLiteral,
    },
    /// Anything the grammar does not cover. Always matches.
    Unrecognized,
}

impl FilterClause {
    fn matches(&self, row: &Map<String, Value>) -> bool {
        match self {
            Self::Contains { field, needle } => {
                value_to_lower_string(row.get(field)).contains(needle.as_str())
            }
            Self::StartsWith { field, needle } => {
                value_to_lower_string(row.get(field)).starts_with(needle.as_str())
            }
            Self::Comparison { field, op, literal } => {
                evaluate_comparison(row.get(field), *op, literal)
            }
            Self::Unrecognized => true,
        }
    }
}

/// Keeps the rows matching every `and`-joined clause of `raw_filter`.
pub fn apply_filter(
    mut rows: Vec<Map<String, Value>>,
    raw_filter: Option<&str>,
) -> Vec<Map<String, Value>> {
    let Some(raw) = raw_filter.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return rows;
    };
    let clauses: Vec<FilterClause> = AND_SEPARATOR
        .split(raw)
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(parse_clause)
        .collect();
    if clauses.is_empty() {
        return rows;
    }
    rows.retain(|row| clauses.iter().all(|clause| clause.matches(row)));
    rows
}

fn parse_clause(clause: &str) -> FilterClause {
    if let Some(caps) = SUBSTRINGOF_CALL.captures(clause) {
        return FilterClause::Contains {
            field: caps[2].to_string(),
            needle: unescape_quotes(&caps[1]).to_lowercase(),
        };
    }
    if let Some(caps) = CONTAINS_CALL.captures(clause) {
        return FilterClause::Contains {
            field: caps[1].to_string(),
            needle: unescape_quotes(&caps[2]).to_lowercase(),
        };
    }
    if let Some(caps) = STARTSWITH_CALL.captures(clause) {
        return FilterClause::StartsWith {
            field: caps[1].to_string(),
            needle: unescape_quotes(&caps[2]).to_lowercase(),
        };
    }
    if let Some(caps) = COMPARISON_CLAUSE.captures(clause) {
        if let Some(op) = ComparisonOp::parse(&caps[2]) {
            return FilterClause::Comparison {
                field: caps[1].to_string(),
                op,
                literal: parse_literal(&caps[3]),
            };
        }
    }
    FilterClause::Unrecognized
}

/// OData V2 string literals double embedded quotes.
fn unescape_quotes(raw: &str) -> String {
    raw.replace("''", "'")
}

fn parse_literal(token: &str) -> FilterLiteral {
    let trimmed = token.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return FilterLiteral::Text(unescape_quotes(&trimmed[1..trimmed.len() - 1]));
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return FilterLiteral::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return FilterLiteral::Bool(false);
    }
    if trimmed.eq_ignore_ascii_case("null") {
        return FilterLiteral::Null;
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        if !value.is_nan() {
            return FilterLiteral::Number(value);
        }
    }
    FilterLiteral::Text(trimmed.to_string())
}

fn evaluate_comparison(left: Option<&Value>, op: ComparisonOp, literal: &FilterLiteral) -> bool {
    // SmartTable probes with `eq ''` while the user is still typing; those
    // clauses must not hide any rows.
    let empty_probe = match literal {
        FilterLiteral::Null => true,
        FilterLiteral::Text(text) => text.is_empty(),
        _ => false,
    };
    if empty_probe && matches!(op, ComparisonOp::Eq | ComparisonOp::Ne) {
        return true;
    }
    if let (Some(left_num), Some(right_num)) = (value_to_number(left), literal.to_number()) {
        return op.holds(left_num.total_cmp(&right_num));
    }
    let left_str = value_to_lower_string(left);
    let right_str = literal.to_lower_string();
    op.holds(left_str.cmp(&right_str))
}

/// Loose numeric coercion: null counts as zero, blank and numeric strings
/// coerce, everything else refuses so the comparison falls back to strings.
pub(crate) fn value_to_number(value: Option<&Value>) -> Option<f64> {
    match value {
        None => None,
        Some(Value::Null) => Some(0.0),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => string_to_number(text),
        Some(_) => None,
    }
}

fn string_to_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|value| !value.is_nan())
}

/// Case-folded display form used for string comparisons. Missing values and
/// nulls collapse to the empty string.
pub(crate) fn value_to_lower_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}
