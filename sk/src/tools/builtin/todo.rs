//! todo_manager tool - per-instance task list with priorities

use async_trait::async_trait;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use crate::config::TodoConfig;
use crate::tools::ledger::{COMPLETED_SHOWN, Priority, TodoLedger, Transition};
use crate::tools::params::{optional_str, required_id, required_str};
use crate::tools::{InstanceId, InstanceStore, ParamType, Tool, ToolDescriptor, ToolError, ToolResult};

/// Reward for a complete/incomplete request that found the item already there
const NO_OP_REWARD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Complete,
    Incomplete,
    List,
    Remove,
    Clear,
    Search,
}

const ACTIONS: &[&str] = &["add", "complete", "incomplete", "list", "remove", "clear", "search"];

impl FromStr for Action {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "complete" => Ok(Self::Complete),
            "incomplete" => Ok(Self::Incomplete),
            "list" => Ok(Self::List),
            "remove" => Ok(Self::Remove),
            "clear" => Ok(Self::Clear),
            "search" => Ok(Self::Search),
            other => Err(ToolError::InvalidArgument(format!(
                "Unknown action '{}'. Available actions: {}",
                other,
                ACTIONS.join(", ")
            ))),
        }
    }
}

/// Manage a todo list, one ledger per instance
pub struct TodoTool {
    descriptor: ToolDescriptor,
    config: TodoConfig,
    store: InstanceStore<TodoLedger>,
}

impl TodoTool {
    pub fn new(config: TodoConfig) -> Self {
        let descriptor = ToolDescriptor::new(
            "todo_manager",
            "Manage a todo list. Add, complete, list, remove, clear and search items with priorities.",
        )
        .enum_param("action", "Action to perform on the todo list", ACTIONS, true)
        .param("item_text", ParamType::String, "Text of the todo item (for add)")
        .param(
            "item_id",
            ParamType::String,
            "ID of the todo item (for complete, incomplete, remove)",
        )
        .enum_param("priority", "Priority of the item (for add, defaults to medium)", &["low", "medium", "high"], false)
        .param("search_query", ParamType::String, "Text to search for (for search)");

        Self {
            descriptor,
            config,
            store: InstanceStore::new("todo_manager"),
        }
    }

    async fn manage(&self, instance_id: &str, params: &Value) -> Result<ToolResult, ToolError> {
        self.store.ensure(instance_id).await?;
        let action = Action::from_str(required_str(params, "action")?)?;
        self.store
            .with(instance_id, |ledger| dispatch(ledger, action, params))
            .await?
    }
}

impl Default for TodoTool {
    fn default() -> Self {
        Self::new(TodoConfig::default())
    }
}

fn dispatch(ledger: &mut TodoLedger, action: Action, params: &Value) -> Result<ToolResult, ToolError> {
    debug!(?action, "todo::dispatch: called");
    match action {
        Action::Add => add(ledger, params),
        Action::Complete => {
            let id = required_id(params, "item_id")?;
            transition(ledger.complete(&id)?, "complete")
        }
        Action::Incomplete => {
            let id = required_id(params, "item_id")?;
            transition(ledger.incomplete(&id)?, "incomplete")
        }
        Action::List => Ok(list(ledger)),
        Action::Remove => {
            let id = required_id(params, "item_id")?;
            let item = ledger.remove(&id)?;
            Ok(
                ToolResult::success(format!("Removed todo item #{}: '{}'", item.id, item.text), 1.0)
                    .with("action", "remove")
                    .with("item_id", item.id)
                    .with("total_items", ledger.len()),
            )
        }
        Action::Clear => {
            let (removed, completed) = ledger.clear();
            Ok(ToolResult::success(
                format!(
                    "Cleared all todo items ({} items removed, {} were completed)",
                    removed, completed
                ),
                1.0,
            )
            .with("action", "clear")
            .with("items_removed", removed)
            .with("completed_removed", completed))
        }
        Action::Search => search(ledger, params),
    }
}

fn add(ledger: &mut TodoLedger, params: &Value) -> Result<ToolResult, ToolError> {
    let text = required_str(params, "item_text")?;
    let priority = match optional_str(params, "priority") {
        Some(p) => Priority::from_str(p)?,
        None => Priority::default(),
    };

    let item = ledger.add(text, priority)?;
    Ok(ToolResult::success(
        format!(
            "Added todo item #{}: '{}' (Priority: {})",
            item.id, item.text, item.priority
        ),
        1.0,
    )
    .with("action", "add")
    .with("item_id", item.id)
    .with("priority", item.priority.to_string())
    .with("total_items", ledger.len()))
}

fn transition(outcome: Transition, action: &str) -> Result<ToolResult, ToolError> {
    match outcome {
        Transition::Unchanged(item) => {
            let state = if item.completed { "completed" } else { "incomplete" };
            Ok(
                ToolResult::success(format!("Todo item #{} is already {}.", item.id, state), NO_OP_REWARD)
                    .with("action", action)
                    .with("item_id", item.id)
                    .with(&format!("already_{}", state), true),
            )
        }
        Transition::Changed(item) => {
            let text = if item.completed {
                format!("Completed todo item #{}: '{}'", item.id, item.text)
            } else {
                format!("Marked todo item #{} as incomplete: '{}'", item.id, item.text)
            };
            Ok(ToolResult::success(text, 1.0)
                .with("action", action)
                .with("item_id", item.id)
                .with("completed", item.completed))
        }
    }
}

fn list(ledger: &TodoLedger) -> ToolResult {
    if ledger.is_empty() {
        return ToolResult::success("Your todo list is empty! Use the 'add' action to create new items.", 1.0)
            .with("action", "list")
            .with("total_items", 0);
    }

    let listing = ledger.list();
    let mut lines = vec!["Todo List:".to_string(), String::new()];

    if !listing.pending.is_empty() {
        lines.push(format!("Pending ({}):", listing.pending.len()));
        lines.extend(listing.pending.iter().map(|item| format!("  {}", item)));
        lines.push(String::new());
    }

    if !listing.completed.is_empty() {
        lines.push(format!("Completed ({}):", listing.completed_count()));
        lines.extend(listing.completed.iter().map(|item| format!("  {}", item)));
        if listing.hidden_completed > 0 {
            lines.push(format!(
                "  ... and {} more completed items",
                listing.hidden_completed
            ));
        }
        lines.push(String::new());
    }

    let rate = listing.completion_rate();
    lines.push(format!(
        "Summary: {} pending, {} completed ({:.1}% completion rate)",
        listing.pending.len(),
        listing.completed_count(),
        rate
    ));

    let pending_ids: Vec<&str> = listing.pending.iter().map(|i| i.id.as_str()).collect();
    let completed_ids: Vec<&str> = listing.completed.iter().map(|i| i.id.as_str()).collect();
    debug!(shown = listing.completed.len(), max = COMPLETED_SHOWN, "todo::list: completed items shown");

    ToolResult::success(lines.join("\n"), 1.0)
        .with("action", "list")
        .with("total_items", listing.total)
        .with("pending_items", listing.pending.len())
        .with("completed_items", listing.completed_count())
        .with("completion_rate", rate)
        .with("pending_ids", pending_ids)
        .with("completed_ids", completed_ids)
}

fn search(ledger: &TodoLedger, params: &Value) -> Result<ToolResult, ToolError> {
    let query = params.get("search_query").and_then(Value::as_str).unwrap_or("");
    let matches = ledger.search(query)?;

    if matches.is_empty() {
        return Ok(
            ToolResult::success(format!("No todo items found matching '{}'", query.trim()), 1.0)
                .with("action", "search")
                .with("matches", 0),
        );
    }

    let mut lines = vec![format!("Search results for '{}':", query.trim()), String::new()];
    lines.extend(matches.iter().map(|item| format!("  {}", item)));
    lines.push(String::new());
    lines.push(format!("Found {} matching item(s)", matches.len()));

    let ids: Vec<&str> = matches.iter().map(|i| i.id.as_str()).collect();
    Ok(ToolResult::success(lines.join("\n"), 1.0)
        .with("action", "search")
        .with("matches", matches.len())
        .with("matching_ids", ids))
}

#[async_trait]
impl Tool for TodoTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn create(&self, instance_id: Option<InstanceId>) -> (InstanceId, ToolResult) {
        let max_items = self.config.max_items;
        let id = self.store.create(instance_id, || TodoLedger::new(max_items)).await;
        (id, ToolResult::success("Todo list created and ready to use!", 0.0))
    }

    async fn execute(&self, instance_id: &str, params: &Value) -> ToolResult {
        debug!(%instance_id, ?params, "TodoTool::execute: called");
        self.manage(instance_id, params)
            .await
            .unwrap_or_else(|e| ToolResult::from_error(&e))
    }

    async fn calc_reward(&self, instance_id: &str) -> Result<f64, ToolError> {
        self.store.with(instance_id, |ledger| ledger.reward()).await
    }

    async fn release(&self, instance_id: &str) -> Result<(), ToolError> {
        let ledger = self.store.release(instance_id).await?;
        debug!(
            %instance_id,
            items = ledger.len(),
            added = ledger.total_added(),
            completed = ledger.total_completed(),
            "TodoTool::release: instance summary"
        );
        Ok(())
    }
}
