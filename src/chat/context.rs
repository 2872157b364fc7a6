use crate::models::{ContextItem, ContextSet};

/// Context items injected into the next request: enabled global items plus
/// enabled project items. On a name collision the project item wins; the
/// override is by name, not id.
pub fn active_context_items(
    global: &ContextSet,
    project: Option<&ContextSet>,
) -> Vec<ContextItem> {
    let mut items: Vec<ContextItem> = Vec::new();

    if global.enabled {
        items.extend(global.enabled_items().cloned());
    }

    if let Some(project) = project {
        if project.enabled {
            for project_item in project.enabled_items() {
                match items.iter_mut().find(|item| item.name == project_item.name) {
                    Some(existing) => *existing = project_item.clone(),
                    None => items.push(project_item.clone()),
                }
            }
        }
    }

    items
}

/// Short human-readable summary of the active items.
pub fn context_summary(items: &[ContextItem]) -> String {
    match items {
        [] => String::new(),
        [only] => only.name.clone(),
        [first, second] => format!("{} and {}", first.name, second.name),
        [first, second, rest @ ..] => {
            format!("{}, {}, and {} more", first.name, second.name, rest.len())
        }
    }
}
