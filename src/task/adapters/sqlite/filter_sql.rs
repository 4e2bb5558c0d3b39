//! Translation of structured filters into parameterized `SQLite` SQL.
//!
//! Column names come from a closed mapping; every literal is a bound
//! parameter.

use super::models::format_timestamp;
use crate::task::domain::{
    Comparison, FieldKind, Filter, FilterField, FilterValue, MalformedFilter, TaskField,
    TimeEntryField,
};
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Bool, Text};
use diesel::sqlite::Sqlite;

/// Maps a filter field onto its `SQLite` column.
pub trait SqlColumn: FilterField {
    /// Quoted column name.
    fn column(self) -> &'static str;

    /// Column holding the JSON tag array, when the entity has tags.
    const TAGS_COLUMN: Option<&'static str>;
}

impl SqlColumn for TaskField {
    const TAGS_COLUMN: Option<&'static str> = Some("tasks.tags");

    fn column(self) -> &'static str {
        match self {
            Self::Id => "tasks.id",
            Self::Name => "tasks.name",
            Self::Priority => "tasks.priority",
            Self::Difficulty => "tasks.difficulty",
            Self::Desc => "tasks.\"desc\"",
            Self::IsImported => "tasks.is_imported",
            Self::SourceId => "tasks.source_id",
            Self::SourceUrl => "tasks.source_url",
        }
    }
}

impl SqlColumn for TimeEntryField {
    const TAGS_COLUMN: Option<&'static str> = None;

    fn column(self) -> &'static str {
        match self {
            Self::Id => "time_entries.id",
            Self::TaskId => "time_entries.task_id",
            Self::Start => "time_entries.start",
            Self::End => "time_entries.\"end\"",
        }
    }
}

/// A bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    /// `BIGINT` parameter.
    Integer(i64),
    /// `TEXT` parameter.
    Text(String),
    /// `BOOLEAN` parameter.
    Bool(bool),
}

/// A `WHERE` clause body with its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPredicate {
    /// SQL text using `?` placeholders.
    pub sql: String,
    /// Parameters for the placeholders.
    pub binds: Vec<BindValue>,
}

impl SqlPredicate {
    fn literal(sql: &str) -> Self {
        Self {
            sql: sql.to_owned(),
            binds: Vec::new(),
        }
    }

    /// Binds every parameter onto a boxed raw query.
    pub fn bind_to<'f>(
        self,
        query: BoxedSqlQuery<'f, Sqlite, SqlQuery>,
    ) -> BoxedSqlQuery<'f, Sqlite, SqlQuery> {
        self.binds
            .into_iter()
            .fold(query, |bound, value| match value {
                BindValue::Integer(integer) => bound.bind::<BigInt, _>(integer),
                BindValue::Text(text) => bound.bind::<Text, _>(text),
                BindValue::Bool(flag) => bound.bind::<Bool, _>(flag),
            })
    }
}

/// Validates and translates a filter.
///
/// # Errors
///
/// Returns [`MalformedFilter`] when the predicate fails validation.
pub fn translate<F: SqlColumn>(filter: &Filter<F>) -> Result<SqlPredicate, MalformedFilter> {
    filter.validate()?;
    let mut binds = Vec::new();
    let sql = render(filter, &mut binds);
    Ok(SqlPredicate { sql, binds })
}

fn render<F: SqlColumn>(filter: &Filter<F>, binds: &mut Vec<BindValue>) -> String {
    match filter {
        Filter::All => SqlPredicate::literal("1").sql,
        Filter::Compare { field, op, value } => render_comparison(*field, *op, value, binds),
        Filter::IsNull(field) => format!("{} IS NULL", field.column()),
        Filter::IsNotNull(field) => format!("{} IS NOT NULL", field.column()),
        Filter::HasTag(tag) => F::TAGS_COLUMN.map_or_else(
            || "0".to_owned(),
            |column| {
                binds.push(BindValue::Text(tag.trim().to_lowercase()));
                format!("EXISTS (SELECT 1 FROM json_each({column}) WHERE json_each.value = ?)")
            },
        ),
        Filter::And(filters) => join(filters, " AND ", "1", binds),
        Filter::Or(filters) => join(filters, " OR ", "0", binds),
        Filter::Not(inner) => format!("NOT ({})", render(inner, binds)),
    }
}

fn join<F: SqlColumn>(
    filters: &[Filter<F>],
    separator: &str,
    empty: &str,
    binds: &mut Vec<BindValue>,
) -> String {
    if filters.is_empty() {
        return empty.to_owned();
    }
    let parts: Vec<String> = filters
        .iter()
        .map(|filter| format!("({})", render(filter, binds)))
        .collect();
    parts.join(separator)
}

fn render_comparison<F: SqlColumn>(
    field: F,
    op: Comparison,
    value: &FilterValue,
    binds: &mut Vec<BindValue>,
) -> String {
    let column = field.column();
    let kind = field.kind();
    if let (FieldKind::Priority | FieldKind::Difficulty, FilterValue::Text(text)) = (kind, value) {
        let levels = kind.level_tags_matching(op, text).unwrap_or_default();
        if levels.is_empty() {
            return "0".to_owned();
        }
        let placeholders = vec!["?"; levels.len()].join(", ");
        binds.extend(
            levels
                .into_iter()
                .map(|level| BindValue::Text(level.to_owned())),
        );
        return format!("{column} IN ({placeholders})");
    }

    binds.push(match value {
        FilterValue::Integer(integer) => BindValue::Integer(*integer),
        FilterValue::Text(text) => BindValue::Text(text.clone()),
        FilterValue::Bool(flag) => BindValue::Bool(*flag),
        FilterValue::Timestamp(timestamp) => BindValue::Text(format_timestamp(*timestamp)),
    });
    format!("{column} {} ?", op.symbol())
}
