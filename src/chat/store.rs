use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::models::Message;

pub const WELCOME_MESSAGE: &str = "Hello! How can I help you today?";

/// In-memory source of truth for per-conversation message history.
///
/// Every write swaps in a freshly built list; a snapshot handed out earlier
/// is never mutated in place, so a reader mid-render always sees a
/// consistent list. All mutations are addressed by `(conversation_id,
/// message_id)`, never an implicit "current" conversation.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<RwLock<HashMap<String, Arc<Vec<Message>>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn welcome() -> Message {
        Message::system(WELCOME_MESSAGE)
    }

    /// Messages for a conversation. An unseen id is initialized with the
    /// welcome message.
    pub fn messages(&self, conversation_id: &str) -> Arc<Vec<Message>> {
        let mut inner = self.inner.write().unwrap();
        inner
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(vec![Self::welcome()]))
            .clone()
    }

    /// Messages for a conversation without initializing an unseen id.
    pub fn snapshot(&self, conversation_id: &str) -> Option<Arc<Vec<Message>>> {
        self.inner.read().unwrap().get(conversation_id).cloned()
    }

    /// Whole-list replace.
    pub fn replace(&self, conversation_id: &str, messages: Vec<Message>) -> Arc<Vec<Message>> {
        let list = Arc::new(messages);
        self.inner
            .write()
            .unwrap()
            .insert(conversation_id.to_string(), list.clone());
        list
    }

    pub fn append(&self, conversation_id: &str, message: Message) -> Arc<Vec<Message>> {
        self.append_all(conversation_id, vec![message])
    }

    /// Append several messages as one atomic update. An unseen conversation
    /// is initialized with the welcome message first.
    pub fn append_all(&self, conversation_id: &str, messages: Vec<Message>) -> Arc<Vec<Message>> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(vec![Self::welcome()]));
        let mut updated = entry.as_ref().clone();
        updated.extend(messages);
        *entry = Arc::new(updated);
        entry.clone()
    }

    /// Overwrite one message's content, leaving ordering and every other
    /// message untouched. Returns `None` when the conversation or the
    /// message id is gone, making stale streaming updates a no-op.
    pub fn update_content(
        &self,
        conversation_id: &str,
        message_id: &str,
        content: &str,
    ) -> Option<Arc<Vec<Message>>> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner.get_mut(conversation_id)?;
        let position = entry.iter().position(|m| m.id == message_id)?;
        let mut updated = entry.as_ref().clone();
        updated[position].content = content.to_string();
        *entry = Arc::new(updated);
        Some(entry.clone())
    }

    /// Remove a message by id. Returns the updated list, or `None` when the
    /// conversation is unknown.
    pub fn delete_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Option<Arc<Vec<Message>>> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner.get_mut(conversation_id)?;
        let updated: Vec<Message> = entry
            .iter()
            .filter(|m| m.id != message_id)
            .cloned()
            .collect();
        *entry = Arc::new(updated);
        Some(entry.clone())
    }

    pub fn contains_message(&self, conversation_id: &str, message_id: &str) -> bool {
        self.inner
            .read()
            .unwrap()
            .get(conversation_id)
            .map(|messages| messages.iter().any(|m| m.id == message_id))
            .unwrap_or(false)
    }

    pub fn remove_conversation(&self, conversation_id: &str) {
        self.inner.write().unwrap().remove(conversation_id);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_unseen_conversation_gets_welcome_message() {
        let store = ConversationStore::new();
        let messages = store.messages("fresh");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn test_snapshot_does_not_initialize() {
        let store = ConversationStore::new();
        assert!(store.snapshot("fresh").is_none());
        store.messages("fresh");
        assert!(store.snapshot("fresh").is_some());
    }

    #[test]
    fn test_append_never_mutates_old_snapshot() {
        let store = ConversationStore::new();
        let before = store.messages("c1");
        let after = store.append("c1", Message::user("hi", Vec::new()));
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_update_content_preserves_order_and_neighbors() {
        let store = ConversationStore::new();
        store.messages("c1");
        let user = Message::user("question", Vec::new());
        let assistant = Message::assistant_placeholder("gpt-4");
        let assistant_id = assistant.id.clone();
        store.append_all("c1", vec![user.clone(), assistant]);

        let updated = store
            .update_content("c1", &assistant_id, "partial answer")
            .unwrap();
        assert_eq!(updated.len(), 3);
        assert_eq!(updated[1].content, "question");
        assert_eq!(updated[2].content, "partial answer");
        assert_eq!(updated[2].id, assistant_id);
    }

    #[test]
    fn test_update_after_delete_is_noop() {
        let store = ConversationStore::new();
        store.messages("c1");
        let assistant = Message::assistant_placeholder("gpt-4");
        let assistant_id = assistant.id.clone();
        store.append("c1", assistant);

        store.delete_message("c1", &assistant_id).unwrap();
        assert!(store.update_content("c1", &assistant_id, "late chunk").is_none());
        assert!(!store.contains_message("c1", &assistant_id));
    }

    #[test]
    fn test_update_unknown_conversation_is_noop() {
        let store = ConversationStore::new();
        assert!(store.update_content("nope", "id", "content").is_none());
        assert!(store.delete_message("nope", "id").is_none());
    }

    #[test]
    fn test_conversations_are_isolated() {
        let store = ConversationStore::new();
        store.messages("a");
        store.append("a", Message::user("for a", Vec::new()));
        let a_before = store.messages("a");

        store.append("b", Message::user("for b", Vec::new()));
        store.append("b", Message::user("more b", Vec::new()));

        let a_after = store.messages("a");
        assert!(Arc::ptr_eq(&a_before, &a_after));
        assert_eq!(a_after.len(), 2);
    }

    #[test]
    fn test_replace_swaps_whole_list() {
        let store = ConversationStore::new();
        let old = store.messages("c1");
        let replacement = vec![Message::system("rebuilt")];
        let new = store.replace("c1", replacement);
        assert_eq!(old.len(), 1);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].content, "rebuilt");
        assert_eq!(old[0].content, WELCOME_MESSAGE);
    }
}
