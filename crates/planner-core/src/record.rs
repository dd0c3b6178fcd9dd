use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::{iso_date_serde, iso_datetime_serde};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Daily,
    Habit,
    #[serde(alias = "weekly_goal")]
    Goal,
    Note,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Daily => "daily",
            Category::Habit => "habit",
            Category::Goal => "goal",
            Category::Note => "note",
        }
    }

    /// Only daily records carry a due date and take part in rollover.
    pub fn is_dated(self) -> bool {
        matches!(self, Category::Daily)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "task" => Ok(Category::Daily),
            "habit" => Ok(Category::Habit),
            "goal" | "weekly_goal" => Ok(Category::Goal),
            "note" => Ok(Category::Note),
            other => Err(anyhow!(
                "unknown category: {other} (expected daily, habit, goal or note)"
            )),
        }
    }
}

/// Stored as the integers 1..=3, where 1 is the most urgent.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    #[default]
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(format!("priority must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.rank()
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "h" | "high" => Ok(Priority::High),
            "2" | "m" | "medium" => Ok(Priority::Medium),
            "3" | "l" | "low" => Ok(Priority::Low),
            other => Err(anyhow!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    #[serde(default = "RecordId::generate")]
    pub id: RecordId,

    pub title: String,

    pub category: Category,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, with = "iso_date_serde::option")]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub completed: bool,

    #[serde(
        rename = "created_date",
        default = "now_local",
        with = "iso_datetime_serde"
    )]
    pub created_at: NaiveDateTime,
}

impl Record {
    pub fn new(
        title: String,
        category: Category,
        priority: Priority,
        due_date: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            title,
            category,
            priority,
            due_date,
            completed: false,
            created_at: now,
        }
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.category.is_dated() && self.due_date == Some(date)
    }
}

fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}
