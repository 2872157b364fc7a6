use serde::{Deserialize, Serialize};

/// User-authored snippet injected into prompts when enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub id: String,
    pub name: String,
    pub content: String,
    pub enabled: bool,
}

/// A toggleable set of context items, owned either globally or by a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSet {
    pub enabled: bool,
    pub items: Vec<ContextItem>,
}

impl ContextSet {
    /// Items that are individually enabled, regardless of the set toggle.
    pub fn enabled_items(&self) -> impl Iterator<Item = &ContextItem> {
        self.items.iter().filter(|item| item.enabled)
    }

    /// True when the set toggle is on and at least one item is enabled.
    pub fn is_active(&self) -> bool {
        self.enabled && self.items.iter().any(|item| item.enabled)
    }
}
