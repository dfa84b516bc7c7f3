//! Tasks, their completed intervals and tag filters

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A unit of work split into `n_pomodoros` intervals of `duration` each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub message: String,
    pub duration: Duration,
    pub n_pomodoros: u32,
    /// Completed intervals, oldest first
    pub pomodoros: Vec<Pomodoro>,
    pub tags: Tags,
}

impl Task {
    /// A task that has not been stored yet (id 0, no intervals).
    pub fn new(
        message: impl Into<String>,
        duration: Duration,
        n_pomodoros: u32,
        tags: Tags,
    ) -> Self {
        Self {
            id: 0,
            message: message.into(),
            duration,
            n_pomodoros,
            pomodoros: vec![],
            tags,
        }
    }

    pub fn completed(&self) -> u32 {
        u32::try_from(self.pomodoros.len()).unwrap_or(u32::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.duration.is_zero() {
            return Err(Error::InvalidTask(format!(
                "task {} has a zero interval duration",
                self.id
            )));
        }
        if self.completed() > self.n_pomodoros {
            return Err(Error::InvalidTask(format!(
                "task {} has {} intervals recorded but only asks for {}",
                self.id,
                self.completed(),
                self.n_pomodoros
            )));
        }
        Ok(())
    }
}

/// One fully consumed work interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pomodoro {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl Pomodoro {
    /// Closes an interval. A wall clock that stepped backwards is clamped so
    /// `end` never precedes `start`.
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn duration(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }
}

/// Free-form key/value labels attached to a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Parses `key=value` pairs; a bare `key` gets an empty value.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut tags = BTreeMap::new();
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = split_tag(arg)?;
            tags.insert(key.to_string(), value.to_string());
        }
        Ok(Self(tags))
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn split_tag(arg: &str) -> Result<(&str, &str)> {
    let mut parts = arg.split('=');
    let key = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default();
    if key.is_empty() || parts.next().is_some() {
        return Err(Error::InvalidTag(arg.to_string()));
    }
    Ok((key, value))
}

/// Predicate used to select tasks from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    Id(i64),
    /// Message contains the given text
    Message(String),
    /// Tag present with exactly this value
    Tag { key: String, value: String },
    /// Any of the inner filters matches
    Any(Vec<TaskFilter>),
}

impl TaskFilter {
    /// `key=value` selects by tag. A bare word selects tasks whose message
    /// contains it or that carry it as a valueless tag.
    pub fn parse_all<S: AsRef<str>>(args: &[S]) -> Result<Vec<TaskFilter>> {
        args.iter()
            .map(|arg| {
                let arg = arg.as_ref();
                let (key, value) = split_tag(arg)?;
                if arg.contains('=') {
                    Ok(TaskFilter::Tag {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                } else {
                    Ok(TaskFilter::Any(vec![
                        TaskFilter::Message(key.to_string()),
                        TaskFilter::Tag {
                            key: key.to_string(),
                            value: String::new(),
                        },
                    ]))
                }
            })
            .collect()
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::Id(id) => task.id == *id,
            TaskFilter::Message(text) => task.message.contains(text.as_str()),
            TaskFilter::Tag { key, value } => task.tags.get(key) == Some(value.as_str()),
            TaskFilter::Any(filters) => filters.iter().any(|f| f.matches(task)),
        }
    }
}

pub fn matches_all(task: &Task, filters: &[TaskFilter]) -> bool {
    filters.iter().all(|f| f.matches(task))
}

/// Parses durations such as `25m`, `90s` or `1h30m`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || Error::InvalidDuration(input.to_string());
    let s = input.trim();
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let n: u64 = digits.parse().map_err(|_| invalid())?;
        digits.clear();
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(invalid()),
        };
        total = n
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(invalid)?;
    }
    // trailing number without a unit
    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(Duration::from_secs(total))
}
