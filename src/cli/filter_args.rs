//! Parsing of `--where FIELD<OP>VALUE` arguments into structured filters.
//!
//! `tag=NAME` selects tasks carrying a tag. On nullable fields the literal
//! `null` with `=` or `!=` tests for absence or presence.

use crate::task::domain::{
    Comparison, Difficulty, FieldKind, Filter, FilterField, FilterValue, Level, MalformedFilter,
    Priority,
};
use chrono::{DateTime, Utc};

const TAG_FIELD: &str = "tag";
const NULL_LITERAL: &str = "null";

/// Parses one `FIELD<OP>VALUE` expression.
///
/// # Errors
///
/// Returns [`MalformedFilter`] for a missing operator, an unknown field, or
/// a value that does not fit the field.
pub fn parse_condition<F: FilterField>(expression: &str) -> Result<Filter<F>, MalformedFilter> {
    let (field_name, op, raw_value) = split_condition(expression)?;

    if field_name.eq_ignore_ascii_case(TAG_FIELD) {
        return tag_condition(op, raw_value);
    }

    let field = F::from_name(field_name).ok_or_else(|| {
        let known: Vec<&str> = F::ALL.iter().map(|candidate| candidate.name()).collect();
        MalformedFilter::new(format!(
            "unknown field '{field_name}' (expected one of: {})",
            known.join(", ")
        ))
    })?;

    if field.is_nullable() && raw_value.eq_ignore_ascii_case(NULL_LITERAL) {
        return match op {
            Comparison::Eq => Ok(Filter::IsNull(field)),
            Comparison::Ne => Ok(Filter::IsNotNull(field)),
            _ => Err(MalformedFilter::new("null only supports = and !=")),
        };
    }

    let value = parse_value(field, raw_value)?;
    let filter = Filter::compare(field, op, value);
    filter.validate()?;
    Ok(filter)
}

/// Parses every expression and joins them with AND.
///
/// An empty list matches everything.
///
/// # Errors
///
/// Returns the first [`MalformedFilter`] encountered.
pub fn parse_conditions<F, S>(expressions: &[S]) -> Result<Filter<F>, MalformedFilter>
where
    F: FilterField,
    S: AsRef<str>,
{
    expressions
        .iter()
        .try_fold(Filter::All, |combined, expression| {
            Ok(combined.and(parse_condition(expression.as_ref())?))
        })
}

fn split_condition(expression: &str) -> Result<(&str, Comparison, &str), MalformedFilter> {
    let found = expression.char_indices().find_map(|(index, _)| {
        let rest = expression.get(index..)?;
        Comparison::ALL
            .iter()
            .find(|op| rest.starts_with(op.symbol()))
            .map(|op| (index, *op))
    });
    let (index, op) = found.ok_or_else(|| {
        MalformedFilter::new(format!(
            "expected FIELD<OP>VALUE with one of = != < <= > >=, got '{expression}'"
        ))
    })?;

    let field = expression.get(..index).unwrap_or_default().trim();
    let value = expression
        .get(index + op.symbol().len()..)
        .unwrap_or_default()
        .trim();
    if field.is_empty() {
        return Err(MalformedFilter::new(format!(
            "missing field name in '{expression}'"
        )));
    }
    Ok((field, op, value))
}

fn tag_condition<F: FilterField>(op: Comparison, tag: &str) -> Result<Filter<F>, MalformedFilter> {
    let has_tag = Filter::has_tag(tag);
    let filter = match op {
        Comparison::Eq => has_tag,
        Comparison::Ne => has_tag.negate(),
        _ => return Err(MalformedFilter::new("tag only supports = and !=")),
    };
    filter.validate()?;
    Ok(filter)
}

fn parse_value<F: FilterField>(field: F, raw: &str) -> Result<FilterValue, MalformedFilter> {
    let invalid = |expected: &str| {
        MalformedFilter::new(format!(
            "field '{}' expects {expected}, got '{raw}'",
            field.name()
        ))
    };
    match field.kind() {
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(FilterValue::Integer)
            .map_err(|_| invalid("an integer")),
        FieldKind::Text => Ok(FilterValue::Text(raw.to_owned())),
        FieldKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(FilterValue::Bool(true)),
            "false" | "no" | "0" => Ok(FilterValue::Bool(false)),
            _ => Err(invalid("true or false")),
        },
        FieldKind::Timestamp => DateTime::parse_from_rfc3339(raw)
            .map(|timestamp| FilterValue::Timestamp(timestamp.with_timezone(&Utc)))
            .map_err(|_| invalid("an RFC 3339 timestamp")),
        FieldKind::Priority => Priority::parse(raw)
            .map(FilterValue::from)
            .map_err(|_| invalid(&Priority::names().join(", "))),
        FieldKind::Difficulty => Difficulty::parse(raw)
            .map(FilterValue::from)
            .map_err(|_| invalid(&Difficulty::names().join(", "))),
    }
}
