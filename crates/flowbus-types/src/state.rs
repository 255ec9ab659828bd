use std::collections::HashMap;

/// Per-`backlog_item_id` state tracked for reporting snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogItem {
    pub backlog_item_id: String,
    pub status: String,
    pub history: Vec<String>,
}

impl BacklogItem {
    fn new(backlog_item_id: impl Into<String>) -> Self {
        BacklogItem {
            backlog_item_id: backlog_item_id.into(),
            status: "new".to_string(),
            history: Vec::new(),
        }
    }

    /// Set `status` and append it to `history`.
    pub fn transition(&mut self, status: impl Into<String>) {
        let status = status.into();
        self.status = status.clone();
        self.history.push(status);
    }
}

/// Per-project mapping of `backlog_item_id -> BacklogItem`, created lazily.
#[derive(Debug, Clone, Default)]
pub struct ProjectState {
    backlog: HashMap<String, BacklogItem>,
}

impl ProjectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a mutable reference to the item, creating it with status
    /// `"new"` and empty history on first reference.
    pub fn get_or_create(&mut self, backlog_item_id: &str) -> &mut BacklogItem {
        self.backlog
            .entry(backlog_item_id.to_string())
            .or_insert_with(|| BacklogItem::new(backlog_item_id))
    }

    pub fn get(&self, backlog_item_id: &str) -> Option<&BacklogItem> {
        self.backlog.get(backlog_item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_initializes_new_then_transitions_accumulate_history() {
        let mut state = ProjectState::new();
        let item = state.get_or_create("item-1");
        assert_eq!(item.status, "new");
        assert!(item.history.is_empty());

        item.transition("clarifying");
        item.transition("in_dev");
        item.transition("done");

        let item = state.get("item-1").unwrap();
        assert_eq!(item.status, "done");
        assert_eq!(item.history, vec!["clarifying", "in_dev", "done"]);
    }

    #[test]
    fn distinct_items_are_independent() {
        let mut state = ProjectState::new();
        state.get_or_create("a").transition("x");
        assert!(state.get("b").is_none());
    }
}
