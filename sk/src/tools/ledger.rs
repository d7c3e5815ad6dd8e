//! TodoLedger - ordered in-memory task store with priorities
//!
//! Ids come from a per-ledger counter starting at 1 and are never reused,
//! even after `remove` or `clear`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::ToolError;

/// How many completed items `list` shows before summarizing the rest
pub const COMPLETED_SHOWN: usize = 10;

/// Item priority; declaration order is the sort rank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl std::str::FromStr for Priority {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(ToolError::InvalidArgument(format!(
                "Invalid priority '{}'. Use low, medium or high",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A single todo item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    seq: u64,
}

impl std::fmt::Display for TodoItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = if self.completed { "[x]" } else { "[ ]" };
        write!(f, "#{} {} ({}) {}", self.id, marker, self.priority, self.text)
    }
}

/// Result of a complete/incomplete request
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The item moved to the requested state
    Changed(TodoItem),
    /// The item was already in the requested state
    Unchanged(TodoItem),
}

/// Snapshot returned by `list`
#[derive(Debug, Clone)]
pub struct Listing {
    /// Pending items by priority, then creation time
    pub pending: Vec<TodoItem>,
    /// Most recently completed first, at most `COMPLETED_SHOWN`
    pub completed: Vec<TodoItem>,
    /// Completed items not shown
    pub hidden_completed: usize,
    pub total: usize,
}

impl Listing {
    pub fn completed_count(&self) -> usize {
        self.completed.len() + self.hidden_completed
    }

    /// Completed share of all items, as a percentage
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed_count() as f64 / self.total as f64 * 100.0
        }
    }
}

/// Per-instance todo store
#[derive(Debug, Clone)]
pub struct TodoLedger {
    items: BTreeMap<u64, TodoItem>,
    next_id: u64,
    total_added: u64,
    total_completed: u64,
    max_items: usize,
}

impl TodoLedger {
    pub fn new(max_items: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
            total_added: 0,
            total_completed: 0,
            max_items,
        }
    }

    pub fn add(&mut self, text: &str, priority: Priority) -> Result<TodoItem, ToolError> {
        debug!(%text, %priority, "TodoLedger::add: called");
        let text = text.trim();
        if text.is_empty() {
            return Err(ToolError::missing("item_text"));
        }
        if self.items.len() >= self.max_items {
            return Err(ToolError::LedgerFull { max: self.max_items });
        }

        let seq = self.next_id;
        let item = TodoItem {
            id: seq.to_string(),
            text: text.to_string(),
            completed: false,
            priority,
            created_at: Utc::now(),
            completed_at: None,
            seq,
        };
        self.items.insert(seq, item.clone());
        self.next_id += 1;
        self.total_added += 1;
        Ok(item)
    }

    pub fn complete(&mut self, id: &str) -> Result<Transition, ToolError> {
        debug!(%id, "TodoLedger::complete: called");
        let item = self.get_mut(id)?;
        if item.completed {
            return Ok(Transition::Unchanged(item.clone()));
        }
        item.completed = true;
        item.completed_at = Some(Utc::now());
        let item = item.clone();
        self.total_completed += 1;
        Ok(Transition::Changed(item))
    }

    pub fn incomplete(&mut self, id: &str) -> Result<Transition, ToolError> {
        debug!(%id, "TodoLedger::incomplete: called");
        let item = self.get_mut(id)?;
        if !item.completed {
            return Ok(Transition::Unchanged(item.clone()));
        }
        item.completed = false;
        item.completed_at = None;
        let item = item.clone();
        self.total_completed = self.total_completed.saturating_sub(1);
        Ok(Transition::Changed(item))
    }

    pub fn list(&self) -> Listing {
        let (mut completed, mut pending): (Vec<TodoItem>, Vec<TodoItem>) =
            self.items.values().cloned().partition(|item| item.completed);

        pending.sort_by(|a, b| (a.priority, a.created_at, a.seq).cmp(&(b.priority, b.created_at, b.seq)));
        completed.sort_by(|a, b| (b.completed_at, b.seq).cmp(&(a.completed_at, a.seq)));

        let hidden_completed = completed.len().saturating_sub(COMPLETED_SHOWN);
        completed.truncate(COMPLETED_SHOWN);

        Listing {
            pending,
            completed,
            hidden_completed,
            total: self.items.len(),
        }
    }

    pub fn remove(&mut self, id: &str) -> Result<TodoItem, ToolError> {
        debug!(%id, "TodoLedger::remove: called");
        let seq = Self::parse_id(id)?;
        let item = self
            .items
            .remove(&seq)
            .ok_or_else(|| ToolError::UnknownItem { id: id.to_string() })?;
        if item.completed {
            self.total_completed = self.total_completed.saturating_sub(1);
        }
        Ok(item)
    }

    /// Remove every item, returning (removed, of which completed)
    pub fn clear(&mut self) -> (usize, usize) {
        let removed = self.items.len();
        let completed = self.items.values().filter(|item| item.completed).count();
        self.items.clear();
        self.total_completed = 0;
        (removed, completed)
    }

    /// Case-insensitive substring match over item text, in id order
    pub fn search(&self, query: &str) -> Result<Vec<TodoItem>, ToolError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ToolError::missing("search_query"));
        }
        Ok(self
            .items
            .values()
            .filter(|item| item.text.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    /// Running productivity signal: completed / added
    pub fn reward(&self) -> f64 {
        if self.total_added == 0 {
            0.0
        } else {
            self.total_completed as f64 / self.total_added as f64
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_added(&self) -> u64 {
        self.total_added
    }

    pub fn total_completed(&self) -> u64 {
        self.total_completed
    }

    fn parse_id(id: &str) -> Result<u64, ToolError> {
        id.trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .map_err(|_| ToolError::UnknownItem { id: id.to_string() })
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut TodoItem, ToolError> {
        let seq = Self::parse_id(id)?;
        self.items
            .get_mut(&seq)
            .ok_or_else(|| ToolError::UnknownItem { id: id.to_string() })
    }
}
