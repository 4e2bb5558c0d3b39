//! Structured filter predicates for list and delete operations.
//!
//! A [`Filter`] names fields from a closed set ([`TaskField`],
//! [`TimeEntryField`]) so adapters can translate it into their native query
//! form without interpolating user text. Predicates are validated with
//! [`Filter::validate`] before use; invalid ones surface as
//! [`MalformedFilter`].

use super::{
    Difficulty, Level, MalformedFilter, Priority, Task, TaskId, TimeEntry, check_storable_timestamp,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparison {
    /// Every operator, two-character symbols first so prefix scans pick the
    /// longest match.
    pub const ALL: [Self; 6] = [Self::Ne, Self::Le, Self::Ge, Self::Eq, Self::Lt, Self::Gt];

    /// Returns the SQL symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Returns `true` for `<`, `<=`, `>`, and `>=`.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    /// Evaluates the operator given how the left operand orders against the
    /// right one.
    #[must_use]
    pub const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Ne => !matches!(ordering, Ordering::Equal),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::Le => !matches!(ordering, Ordering::Greater),
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::Ge => !matches!(ordering, Ordering::Less),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Value type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// 64-bit integer.
    Integer,
    /// Free text.
    Text,
    /// Boolean flag.
    Bool,
    /// UTC timestamp.
    Timestamp,
    /// [`Priority`] tag.
    Priority,
    /// [`Difficulty`] tag.
    Difficulty,
}

impl FieldKind {
    /// For level kinds, the storage tags of every level satisfying
    /// `level <op> value`. Returns `None` for non-level kinds or an unknown
    /// level name.
    #[must_use]
    pub fn level_tags_matching(self, op: Comparison, value: &str) -> Option<Vec<&'static str>> {
        match self {
            Self::Priority => levels_matching::<Priority>(op, value),
            Self::Difficulty => levels_matching::<Difficulty>(op, value),
            Self::Integer | Self::Text | Self::Bool | Self::Timestamp => None,
        }
    }

    const fn is_level(self) -> bool {
        matches!(self, Self::Priority | Self::Difficulty)
    }
}

fn levels_matching<L: Level>(op: Comparison, value: &str) -> Option<Vec<&'static str>> {
    let target = L::parse(value).ok()?;
    Some(
        L::ALL
            .iter()
            .copied()
            .filter(|level| op.holds(level.cmp(&target)))
            .map(L::as_str)
            .collect(),
    )
}

/// Literal operand of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    /// Integer literal.
    Integer(i64),
    /// Text literal; also carries priority and difficulty tags.
    Text(String),
    /// Boolean literal.
    Bool(bool),
    /// Timestamp literal.
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Bool(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<TaskId> for FilterValue {
    fn from(value: TaskId) -> Self {
        Self::Integer(value.value())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Priority> for FilterValue {
    fn from(value: Priority) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

impl From<Difficulty> for FilterValue {
    fn from(value: Difficulty) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

/// A closed set of filterable fields for one entity.
pub trait FilterField: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every field.
    const ALL: &'static [Self];

    /// Whether [`Filter::HasTag`] applies to this entity.
    const SUPPORTS_TAGS: bool;

    /// User-facing field name.
    fn name(self) -> &'static str;

    /// Value type of the field.
    fn kind(self) -> FieldKind;

    /// Whether the field may be absent.
    fn is_nullable(self) -> bool;

    /// Looks a field up by its user-facing name, ignoring ASCII case.
    fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(trimmed))
    }
}

/// Filterable task fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    /// Row id.
    Id,
    /// Task name.
    Name,
    /// Priority level.
    Priority,
    /// Difficulty level.
    Difficulty,
    /// Description.
    Desc,
    /// Importer flag.
    IsImported,
    /// External provenance identifier.
    SourceId,
    /// External provenance URL.
    SourceUrl,
}

impl FilterField for TaskField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Name,
        Self::Priority,
        Self::Difficulty,
        Self::Desc,
        Self::IsImported,
        Self::SourceId,
        Self::SourceUrl,
    ];
    const SUPPORTS_TAGS: bool = true;

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Priority => "priority",
            Self::Difficulty => "difficulty",
            Self::Desc => "desc",
            Self::IsImported => "is_imported",
            Self::SourceId => "source_id",
            Self::SourceUrl => "source_url",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Id => FieldKind::Integer,
            Self::Name | Self::Desc | Self::SourceId | Self::SourceUrl => FieldKind::Text,
            Self::Priority => FieldKind::Priority,
            Self::Difficulty => FieldKind::Difficulty,
            Self::IsImported => FieldKind::Bool,
        }
    }

    fn is_nullable(self) -> bool {
        matches!(self, Self::SourceId | Self::SourceUrl)
    }
}

/// Filterable time entry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEntryField {
    /// Row id.
    Id,
    /// Owning task id.
    TaskId,
    /// Interval start.
    Start,
    /// Interval end.
    End,
}

impl FilterField for TimeEntryField {
    const ALL: &'static [Self] = &[Self::Id, Self::TaskId, Self::Start, Self::End];
    const SUPPORTS_TAGS: bool = false;

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::TaskId => "task_id",
            Self::Start => "start",
            Self::End => "end",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Id | Self::TaskId => FieldKind::Integer,
            Self::Start | Self::End => FieldKind::Timestamp,
        }
    }

    fn is_nullable(self) -> bool {
        matches!(self, Self::End)
    }
}

/// Boolean predicate over one entity's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter<F> {
    /// Matches every row.
    All,
    /// `field <op> value`; never matches an absent field.
    Compare {
        /// Compared field.
        field: F,
        /// Operator.
        op: Comparison,
        /// Right-hand operand.
        value: FilterValue,
    },
    /// The field is absent.
    IsNull(F),
    /// The field is present.
    IsNotNull(F),
    /// The entity carries the tag (compared lowercase).
    HasTag(String),
    /// All sub-predicates hold; empty means true.
    And(Vec<Self>),
    /// Any sub-predicate holds; empty means false.
    Or(Vec<Self>),
    /// The sub-predicate does not hold.
    Not(Box<Self>),
}

impl<F> Default for Filter<F> {
    fn default() -> Self {
        Self::All
    }
}

impl<F: FilterField> Filter<F> {
    /// `field <op> value`.
    pub fn compare(field: F, op: Comparison, value: impl Into<FilterValue>) -> Self {
        Self::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    /// `field = value`.
    pub fn eq(field: F, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, Comparison::Eq, value)
    }

    /// The entity carries `tag`.
    pub fn has_tag(tag: impl Into<String>) -> Self {
        Self::HasTag(tag.into())
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::All, rhs) => rhs,
            (lhs, Self::All) => lhs,
            (Self::And(mut lhs), Self::And(rhs)) => {
                lhs.extend(rhs);
                Self::And(lhs)
            }
            (Self::And(mut lhs), rhs) => {
                lhs.push(rhs);
                Self::And(lhs)
            }
            (lhs, rhs) => Self::And(vec![lhs, rhs]),
        }
    }

    /// Disjunction, flattening nested `Or`s.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Or(mut lhs), Self::Or(rhs)) => {
                lhs.extend(rhs);
                Self::Or(lhs)
            }
            (Self::Or(mut lhs), rhs) => {
                lhs.push(rhs);
                Self::Or(lhs)
            }
            (lhs, rhs) => Self::Or(vec![lhs, rhs]),
        }
    }

    /// Negation.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Checks operand types, null tests, and tag support.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedFilter`] describing the first invalid
    /// sub-predicate.
    pub fn validate(&self) -> Result<(), MalformedFilter> {
        match self {
            Self::All => Ok(()),
            Self::Compare { field, op, value } => validate_comparison(*field, *op, value),
            Self::IsNull(field) | Self::IsNotNull(field) => {
                if field.is_nullable() {
                    Ok(())
                } else {
                    Err(MalformedFilter::new(format!(
                        "field '{}' is never null",
                        field.name()
                    )))
                }
            }
            Self::HasTag(tag) => {
                if !F::SUPPORTS_TAGS {
                    return Err(MalformedFilter::new("tag predicates do not apply here"));
                }
                if tag.trim().is_empty() {
                    return Err(MalformedFilter::new("tag predicate needs a tag"));
                }
                Ok(())
            }
            Self::And(filters) | Self::Or(filters) => filters.iter().try_for_each(Self::validate),
            Self::Not(inner) => inner.validate(),
        }
    }

    /// Evaluates the predicate against an entity.
    ///
    /// Evaluation is three-valued like SQL: a comparison against an absent
    /// field is unknown, unknown propagates through `Not`, `And`, and `Or`,
    /// and only a predicate that is known to hold matches. The predicate is
    /// expected to have passed [`Filter::validate`]; ill-typed comparisons
    /// are unknown.
    pub fn matches<E: Filterable<F>>(&self, entity: &E) -> bool {
        self.evaluate(entity) == Some(true)
    }

    fn evaluate<E: Filterable<F>>(&self, entity: &E) -> Option<bool> {
        match self {
            Self::All => Some(true),
            Self::Compare { field, op, value } => {
                let stored = entity.field_value(*field)?;
                compare_values(field.kind(), &stored, value).map(|ordering| op.holds(ordering))
            }
            Self::IsNull(field) => Some(entity.field_value(*field).is_none()),
            Self::IsNotNull(field) => Some(entity.field_value(*field).is_some()),
            Self::HasTag(tag) => {
                let wanted = tag.trim().to_lowercase();
                Some(entity.tag_list().iter().any(|candidate| *candidate == wanted))
            }
            Self::And(filters) => filters
                .iter()
                .map(|filter| filter.evaluate(entity))
                .fold(Some(true), |acc, next| match (acc, next) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }),
            Self::Or(filters) => filters
                .iter()
                .map(|filter| filter.evaluate(entity))
                .fold(Some(false), |acc, next| match (acc, next) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }),
            Self::Not(inner) => inner.evaluate(entity).map(|held| !held),
        }
    }
}

fn validate_comparison<F: FilterField>(
    field: F,
    op: Comparison,
    value: &FilterValue,
) -> Result<(), MalformedFilter> {
    let kind = field.kind();
    let mismatch = || {
        MalformedFilter::new(format!(
            "field '{}' cannot be compared with a {} value",
            field.name(),
            value.type_name()
        ))
    };
    match (kind, value) {
        (FieldKind::Integer, FilterValue::Integer(_)) | (FieldKind::Text, FilterValue::Text(_)) => {
            Ok(())
        }
        (FieldKind::Timestamp, FilterValue::Timestamp(timestamp)) => {
            check_storable_timestamp(*timestamp)
                .map_err(|err| MalformedFilter::new(format!("field '{}': {err}", field.name())))
        }
        (FieldKind::Bool, FilterValue::Bool(_)) if op.is_ordering() => Err(MalformedFilter::new(
            format!("field '{}' only supports = and !=", field.name()),
        )),
        (FieldKind::Bool, FilterValue::Bool(_)) => Ok(()),
        (FieldKind::Priority | FieldKind::Difficulty, FilterValue::Text(text)) => kind
            .level_tags_matching(op, text)
            .map(|_| ())
            .ok_or_else(|| {
                MalformedFilter::new(format!("unknown {} level '{text}'", field.name()))
            }),
        _ => Err(mismatch()),
    }
}

fn compare_values(kind: FieldKind, stored: &FilterValue, target: &FilterValue) -> Option<Ordering> {
    match (stored, target) {
        (FilterValue::Integer(lhs), FilterValue::Integer(rhs)) => Some(lhs.cmp(rhs)),
        (FilterValue::Text(lhs), FilterValue::Text(rhs)) if kind.is_level() => {
            compare_levels(kind, lhs, rhs)
        }
        (FilterValue::Text(lhs), FilterValue::Text(rhs)) => Some(lhs.cmp(rhs)),
        (FilterValue::Bool(lhs), FilterValue::Bool(rhs)) => Some(lhs.cmp(rhs)),
        (FilterValue::Timestamp(lhs), FilterValue::Timestamp(rhs)) => Some(lhs.cmp(rhs)),
        _ => None,
    }
}

fn compare_levels(kind: FieldKind, lhs: &str, rhs: &str) -> Option<Ordering> {
    match kind {
        FieldKind::Priority => Some(Priority::parse(lhs).ok()?.cmp(&Priority::parse(rhs).ok()?)),
        FieldKind::Difficulty => Some(
            Difficulty::parse(lhs)
                .ok()?
                .cmp(&Difficulty::parse(rhs).ok()?),
        ),
        FieldKind::Integer | FieldKind::Text | FieldKind::Bool | FieldKind::Timestamp => None,
    }
}

/// Exposes an entity's fields to in-memory filter evaluation.
pub trait Filterable<F: FilterField> {
    /// Current value of `field`, `None` when absent.
    fn field_value(&self, field: F) -> Option<FilterValue>;

    /// Tags consulted by [`Filter::HasTag`].
    fn tag_list(&self) -> &[String];
}

impl Filterable<TaskField> for Task {
    fn field_value(&self, field: TaskField) -> Option<FilterValue> {
        match field {
            TaskField::Id => self.id().map(FilterValue::from),
            TaskField::Name => Some(self.name().into()),
            TaskField::Priority => Some(self.priority().into()),
            TaskField::Difficulty => Some(self.difficulty().into()),
            TaskField::Desc => Some(self.desc().into()),
            TaskField::IsImported => Some(self.is_imported().into()),
            TaskField::SourceId => self.source_id().map(FilterValue::from),
            TaskField::SourceUrl => self.source_url().map(FilterValue::from),
        }
    }

    fn tag_list(&self) -> &[String] {
        self.tags()
    }
}

impl Filterable<TimeEntryField> for TimeEntry {
    fn field_value(&self, field: TimeEntryField) -> Option<FilterValue> {
        match field {
            TimeEntryField::Id => self.id().map(|id| FilterValue::Integer(id.value())),
            TimeEntryField::TaskId => Some(self.task_id().into()),
            TimeEntryField::Start => Some(self.start().into()),
            TimeEntryField::End => self.end().map(FilterValue::from),
        }
    }

    fn tag_list(&self) -> &[String] {
        &[]
    }
}
