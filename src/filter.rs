//! Filter specifications, compiled predicates, and root-level ordering.
//!
//! A [`FilterSpec`] is validated once at the boundary (CLI flags or tool
//! arguments) and then compiled into a [`Predicate`] and an optional
//! [`TaskComparator`]. The predicate is applied at every tree level; the
//! comparator only orders root tasks.

use crate::error::{TaskError, TaskResult};
use crate::types::{Priority, Task, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Attribute a sort key can order by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    CompletedAt,
    Priority,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::CompletedAt => "completed_at",
            SortField::Priority => "priority",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "created_at" | "created" => Some(SortField::CreatedAt),
            "completed_at" | "completed" => Some(SortField::CompletedAt),
            "priority" => Some(SortField::Priority),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// One level of a sort specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: SortField) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: SortField) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Parse `field` or `field:direction` (direction defaults to ascending).
    pub fn parse(s: &str) -> TaskResult<Self> {
        let (field, direction) = match s.split_once(':') {
            Some((field, direction)) => (field, Some(direction)),
            None => (s, None),
        };
        let field = SortField::parse(field).ok_or_else(|| {
            TaskError::invalid_value(
                "sort",
                format!(
                    "Unknown sort field '{}'. Valid fields: created_at, completed_at, priority",
                    field
                ),
            )
        })?;
        let direction = match direction {
            Some(d) => SortDirection::parse(d).ok_or_else(|| {
                TaskError::invalid_value(
                    "sort",
                    format!("Unknown sort direction '{}'. Use asc or desc", d),
                )
            })?,
            None => SortDirection::Asc,
        };
        Ok(Self { field, direction })
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        // Option ordering puts a missing completed_at before any timestamp
        let ord = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::CompletedAt => a.completed_at.cmp(&b.completed_at),
            SortField::Priority => a.priority.cmp(&b.priority),
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Two-level sort: primary key with an optional tie-break.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub first: Option<SortKey>,
    pub second: Option<SortKey>,
}

impl SortSpec {
    pub fn keys(&self) -> impl Iterator<Item = &SortKey> {
        self.first.iter().chain(self.second.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }
}

/// Request-scoped filter and sort specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub sort: SortSpec,
}

/// Loose wire shape accepted from tool arguments.
#[derive(Debug, Default, Deserialize)]
struct RawFilter {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    sort: Option<RawSort>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSort {
    field1: Option<String>,
    order1: Option<String>,
    field2: Option<String>,
    order2: Option<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    pub fn sorted_by(mut self, first: SortKey, second: Option<SortKey>) -> Self {
        self.sort = SortSpec {
            first: Some(first),
            second,
        };
        self
    }

    /// Build a filter from a list of `field[:direction]` sort arguments.
    /// At most two keys are accepted.
    pub fn with_sort_args<S: AsRef<str>>(mut self, args: &[S]) -> TaskResult<Self> {
        if args.len() > 2 {
            return Err(TaskError::invalid_value(
                "sort",
                "At most two sort keys are supported",
            ));
        }
        let mut keys = args.iter().map(|a| SortKey::parse(a.as_ref()));
        let first = keys.next().transpose()?;
        let second = keys.next().transpose()?;
        self.sort = SortSpec { first, second };
        Ok(self)
    }

    /// Validate a loosely-typed JSON filter object.
    ///
    /// Accepted shape:
    /// `{"status": "done", "priority": 3 | "high", "search": "text",
    ///   "sort": {"field1": "priority", "order1": "desc", "field2": "created_at"}}`
    pub fn from_value(value: &Value) -> TaskResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let raw: RawFilter = serde_json::from_value(value.clone())
            .map_err(|e| TaskError::invalid_value("filter", e.to_string()))?;

        let status = match raw.status.as_deref() {
            None => None,
            Some(s) => Some(TaskStatus::parse(s).ok_or_else(|| {
                TaskError::invalid_value("status", format!("Invalid status '{}'", s))
            })?),
        };

        let priority = match raw.priority {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_priority_value(&v)?),
        };

        let mut spec = Self {
            status,
            priority,
            ..Self::default()
        };
        if let Some(search) = raw.search {
            spec = spec.with_search(search);
        }
        if let Some(sort) = raw.sort {
            spec.sort = SortSpec {
                first: sort_level(sort.field1, sort.order1)?,
                second: sort_level(sort.field2, sort.order2)?,
            };
        }
        Ok(spec)
    }

    /// Compile the filter part into a predicate.
    pub fn predicate(&self) -> Predicate {
        Predicate {
            status: self.status,
            priority: self.priority,
            needle: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        }
    }

    /// Compile the sort part; `None` means store-default order.
    pub fn comparator(&self) -> Option<TaskComparator> {
        if self.sort.is_empty() {
            None
        } else {
            Some(TaskComparator {
                keys: self.sort.keys().copied().collect(),
            })
        }
    }
}

/// Parse a priority given as a level number or a name.
pub fn parse_priority_value(value: &Value) -> TaskResult<Priority> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().and_then(Priority::from_level),
        Value::String(s) => Priority::parse(s),
        _ => None,
    };
    parsed.ok_or_else(|| {
        TaskError::invalid_value(
            "priority",
            format!(
                "Invalid priority {}. Use 1-5 or low, medium, high, very_high, critical",
                value
            ),
        )
    })
}

fn sort_level(field: Option<String>, order: Option<String>) -> TaskResult<Option<SortKey>> {
    let Some(field) = field else {
        return Ok(None);
    };
    let spec = match order {
        Some(order) => format!("{}:{}", field, order),
        None => field,
    };
    SortKey::parse(&spec).map(Some)
}

/// Pure task predicate compiled from a [`FilterSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    status: Option<TaskStatus>,
    priority: Option<Priority>,
    /// Lowercased search term.
    needle: Option<String>,
}

impl Predicate {
    pub fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        match self.needle {
            Some(ref needle) => {
                task.title.to_lowercase().contains(needle.as_str())
                    || task.description.to_lowercase().contains(needle.as_str())
            }
            None => true,
        }
    }
}

/// Ordering over tasks built from up to two sort keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskComparator {
    keys: Vec<SortKey>,
}

impl TaskComparator {
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        for key in &self.keys {
            let ord = key.compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable sort: ties keep their incoming relative order.
    pub fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}
