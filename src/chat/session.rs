use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::context;
use super::naming::derive_conversation_name;
use super::store::ConversationStore;
use crate::models::{
    catalog, AiModel, Attachment, ContextItem, ContextSet, Conversation, Message, Project, Role,
    DEFAULT_CONVERSATION_NAME,
};
use crate::transport::types::{
    ChatRequestBody, ModelRef, RequestAttachment, StreamEvent, TransportError,
};
use crate::transport::ChatTransport;

/// Shown in place of the reply when an exchange fails after its placeholder
/// was created. The exchange is never silently dropped.
pub const FAILURE_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

const STREAM_READ_TIMEOUT: Duration = Duration::from_secs(30);
const STREAM_CHANNEL_CAPACITY: usize = 64;
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Broadcast to observers whenever a state transition mutates a
/// conversation's messages.
#[derive(Debug, Clone)]
pub struct ConversationUpdate {
    pub conversation_id: String,
    pub messages: Arc<Vec<Message>>,
}

/// What `send_message` did with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange ran to a terminal state (completed, failed, or
    /// cancelled by a delete).
    Sent,
    /// Empty text and no attachments: nothing created, no network call.
    RejectedEmpty,
    /// The conversation already has an exchange in flight.
    RejectedBusy,
}

struct InFlight {
    token: CancellationToken,
    assistant_id: Option<String>,
}

/// Orchestrates exchanges: builds requests from session state, drives the
/// transport's chunk sequence into the store, and owns the conversation /
/// project / context bookkeeping around them.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    store: ConversationStore,
    conversations: RwLock<Vec<Conversation>>,
    projects: RwLock<Vec<Project>>,
    global_context: RwLock<ContextSet>,
    model: RwLock<AiModel>,
    active_conversation: RwLock<String>,
    active_project: RwLock<Option<String>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    updates: broadcast::Sender<ConversationUpdate>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        let store = ConversationStore::new();
        let conversation = Conversation::new(None);
        store.messages(&conversation.id);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            transport,
            store,
            active_conversation: RwLock::new(conversation.id.clone()),
            conversations: RwLock::new(vec![conversation]),
            projects: RwLock::new(Vec::new()),
            global_context: RwLock::new(ContextSet::default()),
            model: RwLock::new(catalog::default_model()),
            active_project: RwLock::new(None),
            in_flight: Mutex::new(HashMap::new()),
            updates,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationUpdate> {
        self.updates.subscribe()
    }

    // --- Sending ---

    /// Run one exchange for `conversation_id` to a terminal state. Empty
    /// input and a conversation that is already streaming are rejected as
    /// no-ops; an upload failure aborts before any message is created.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<SendOutcome, TransportError> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Ok(SendOutcome::RejectedEmpty);
        }

        let token = CancellationToken::new();
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if in_flight.contains_key(conversation_id) {
                return Ok(SendOutcome::RejectedBusy);
            }
            in_flight.insert(
                conversation_id.to_string(),
                InFlight {
                    token: token.clone(),
                    assistant_id: None,
                },
            );
        }

        let result = self
            .run_exchange(conversation_id, text, attachments, token)
            .await;

        self.in_flight.lock().unwrap().remove(conversation_id);

        result
    }

    async fn run_exchange(
        &self,
        conversation_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
        token: CancellationToken,
    ) -> Result<SendOutcome, TransportError> {
        // Resolve attachments first so the user message only ever carries
        // durable descriptors. An upload failure aborts the whole send.
        let attachments = if attachments.iter().any(Attachment::needs_upload) {
            self.transport.upload_attachments(attachments).await?
        } else {
            attachments
        };

        let model = self.model.read().unwrap().clone();
        let user_message = Message::user(text, attachments.clone());
        let assistant_message = Message::assistant_placeholder(model.id.clone());
        let assistant_id = assistant_message.id.clone();

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(entry) = in_flight.get_mut(conversation_id) {
                entry.assistant_id = Some(assistant_id.clone());
            }
        }

        let messages = self
            .store
            .append_all(conversation_id, vec![user_message, assistant_message]);
        self.notify(conversation_id, messages);

        let request = self.build_request(conversation_id, text, &attachments, &model);

        let (tx, mut rx) = mpsc::channel::<StreamEvent>(STREAM_CHANNEL_CAPACITY);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.send_chat(request, tx.clone()).await {
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
            }
        });

        let mut buffer = String::new();

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(conversation_id, "exchange cancelled, discarding stream");
                    return Ok(SendOutcome::Sent);
                }
                event = timeout(STREAM_READ_TIMEOUT, rx.recv()) => {
                    match event {
                        Err(_) => {
                            self.fail_exchange(conversation_id, &assistant_id, "stream read timed out");
                            return Ok(SendOutcome::Sent);
                        }
                        Ok(Some(StreamEvent::Chunk(chunk))) => {
                            buffer.push_str(&chunk);
                            if self
                                .store
                                .update_content(conversation_id, &assistant_id, &buffer)
                                .is_none()
                            {
                                // The placeholder was deleted mid-stream:
                                // stop the exchange instead of dropping
                                // chunks one by one.
                                token.cancel();
                                return Ok(SendOutcome::Sent);
                            }
                        }
                        Ok(Some(StreamEvent::Done)) => {
                            self.complete_exchange(conversation_id);
                            return Ok(SendOutcome::Sent);
                        }
                        Ok(Some(StreamEvent::Error(error))) => {
                            self.fail_exchange(conversation_id, &assistant_id, &error);
                            return Ok(SendOutcome::Sent);
                        }
                        Ok(None) => {
                            if buffer.is_empty() {
                                self.fail_exchange(
                                    conversation_id,
                                    &assistant_id,
                                    "stream ended unexpectedly",
                                );
                            } else {
                                self.complete_exchange(conversation_id);
                            }
                            return Ok(SendOutcome::Sent);
                        }
                    }
                }
            }
        }
    }

    fn complete_exchange(&self, conversation_id: &str) {
        if let Some(messages) = self.store.snapshot(conversation_id) {
            self.notify(conversation_id, messages);
        }
    }

    fn fail_exchange(&self, conversation_id: &str, assistant_id: &str, error: &str) {
        tracing::error!(conversation_id, error, "chat exchange failed");
        // Replacement, not concatenation: partial streamed content is
        // discarded along with the error.
        if let Some(messages) =
            self.store
                .update_content(conversation_id, assistant_id, FAILURE_MESSAGE)
        {
            self.notify(conversation_id, messages);
        }
    }

    fn build_request(
        &self,
        conversation_id: &str,
        text: &str,
        attachments: &[Attachment],
        model: &AiModel,
    ) -> ChatRequestBody {
        let project = self.active_project();
        let global = self.global_context.read().unwrap().clone();
        let context_items =
            context::active_context_items(&global, project.as_ref().map(|p| &p.context));

        ChatRequestBody {
            message: text.to_string(),
            attachments: attachments.iter().map(RequestAttachment::from).collect(),
            context_items,
            model: ModelRef {
                id: model.id.clone(),
                name: model.name.clone(),
            },
            conversation_id: conversation_id.to_string(),
            project_context: project.map(|p| p.context),
        }
    }

    fn notify(&self, conversation_id: &str, messages: Arc<Vec<Message>>) {
        self.apply_derived_name(conversation_id, &messages);
        let _ = self.updates.send(ConversationUpdate {
            conversation_id: conversation_id.to_string(),
            messages,
        });
    }

    /// Built-in observer: a conversation still carrying the default name is
    /// renamed after the first user message.
    fn apply_derived_name(&self, conversation_id: &str, messages: &[Message]) {
        let mut conversations = self.conversations.write().unwrap();
        let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id)
        else {
            return;
        };
        if conversation.name != DEFAULT_CONVERSATION_NAME {
            return;
        }
        if let Some(first_user) = messages.iter().find(|m| m.role == Role::User) {
            if !first_user.content.is_empty() {
                conversation.name = derive_conversation_name(&first_user.content);
            }
        }
    }

    // --- Messages ---

    pub fn messages(&self, conversation_id: &str) -> Arc<Vec<Message>> {
        self.store.messages(conversation_id)
    }

    /// Delete a message. Deleting the assistant message of an in-flight
    /// exchange cancels that exchange; late chunks never resurrect it.
    pub fn delete_message(&self, conversation_id: &str, message_id: &str) {
        {
            let in_flight = self.in_flight.lock().unwrap();
            if let Some(entry) = in_flight.get(conversation_id) {
                if entry.assistant_id.as_deref() == Some(message_id) {
                    entry.token.cancel();
                }
            }
        }
        if let Some(messages) = self.store.delete_message(conversation_id, message_id) {
            self.notify(conversation_id, messages);
        }
    }

    // --- Conversations ---

    pub fn create_conversation(&self) -> Conversation {
        let project_id = self.active_project.read().unwrap().clone();
        let conversation = Conversation::new(project_id);
        let messages = self.store.messages(&conversation.id);
        self.conversations.write().unwrap().push(conversation.clone());
        *self.active_conversation.write().unwrap() = conversation.id.clone();
        self.notify(&conversation.id, messages);
        conversation
    }

    pub fn select_conversation(&self, conversation_id: &str) -> bool {
        let exists = self
            .conversations
            .read()
            .unwrap()
            .iter()
            .any(|c| c.id == conversation_id);
        if exists {
            *self.active_conversation.write().unwrap() = conversation_id.to_string();
        }
        exists
    }

    pub fn rename_conversation(&self, conversation_id: &str, name: impl Into<String>) {
        let mut conversations = self.conversations.write().unwrap();
        if let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id) {
            conversation.name = name.into();
        }
    }

    /// Delete a conversation, cancelling any exchange it has in flight.
    /// Deleting the active conversation falls back to the first remaining
    /// one, or creates a fresh conversation when none is left.
    pub fn delete_conversation(&self, conversation_id: &str) {
        {
            let in_flight = self.in_flight.lock().unwrap();
            if let Some(entry) = in_flight.get(conversation_id) {
                entry.token.cancel();
            }
        }

        let was_active = *self.active_conversation.read().unwrap() == conversation_id;
        let first_remaining = {
            let mut conversations = self.conversations.write().unwrap();
            conversations.retain(|c| c.id != conversation_id);
            conversations.first().map(|c| c.id.clone())
        };
        self.store.remove_conversation(conversation_id);

        if was_active {
            match first_remaining {
                Some(id) => *self.active_conversation.write().unwrap() = id,
                None => {
                    self.create_conversation();
                }
            }
        }
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().unwrap().clone()
    }

    pub fn active_conversation_id(&self) -> String {
        self.active_conversation.read().unwrap().clone()
    }

    // --- Context ---

    pub fn global_context(&self) -> ContextSet {
        self.global_context.read().unwrap().clone()
    }

    /// Replace the global context set, appending a status notice to the
    /// active conversation when the effective state changes.
    pub fn set_global_context(&self, new_context: ContextSet) {
        let previous = {
            let mut guard = self.global_context.write().unwrap();
            std::mem::replace(&mut *guard, new_context.clone())
        };

        let was_enabled = previous.enabled;
        let was_empty = previous.enabled_items().count() == 0;
        let has_enabled_items = new_context.items.iter().any(|i| i.enabled);
        let now_active = new_context.enabled && has_enabled_items;
        let was_active = was_enabled && !was_empty;

        let notice = if (!was_enabled || was_empty) && now_active {
            let names: Vec<&str> = new_context
                .enabled_items()
                .map(|i| i.name.as_str())
                .collect();
            Some(format!(
                "Custom context enabled with {} item{}: {}",
                names.len(),
                if names.len() == 1 { "" } else { "s" },
                names.join(", ")
            ))
        } else if was_active && !now_active {
            Some("Custom context disabled.".to_string())
        } else if was_enabled && new_context.enabled && has_enabled_items {
            let old_count = previous.enabled_items().count();
            let new_count = new_context.enabled_items().count();
            (old_count != new_count).then(|| {
                format!(
                    "Context updated: {} item{} active",
                    new_count,
                    if new_count == 1 { "" } else { "s" }
                )
            })
        } else {
            None
        };

        if let Some(content) = notice {
            self.append_status_message(&self.active_conversation_id(), content);
        }
    }

    /// Context items that the next send on the active conversation will
    /// carry: enabled global items with project overrides applied by name.
    pub fn active_context_items(&self) -> Vec<ContextItem> {
        let project = self.active_project();
        let global = self.global_context.read().unwrap();
        context::active_context_items(&global, project.as_ref().map(|p| &p.context))
    }

    // --- Model ---

    pub fn model(&self) -> AiModel {
        self.model.read().unwrap().clone()
    }

    pub fn set_model(&self, model: AiModel) {
        let notice = format!("Switching to {}. {}", model.name, model.description);
        *self.model.write().unwrap() = model;
        self.append_status_message(&self.active_conversation_id(), notice);
    }

    // --- Projects ---

    pub fn create_project(&self, project: Project) {
        self.projects.write().unwrap().push(project);
    }

    pub fn update_project(&self, project: Project) {
        let mut projects = self.projects.write().unwrap();
        if let Some(existing) = projects.iter_mut().find(|p| p.id == project.id) {
            *existing = project;
        }
    }

    pub fn delete_project(&self, project_id: &str) {
        self.projects.write().unwrap().retain(|p| p.id != project_id);

        let cleared = {
            let mut active = self.active_project.write().unwrap();
            if active.as_deref() == Some(project_id) {
                *active = None;
                true
            } else {
                false
            }
        };
        if cleared {
            self.append_status_message(
                &self.active_conversation_id(),
                "Project has been removed from this conversation.".to_string(),
            );
        }
    }

    /// Make a project active, associating it with the active conversation.
    pub fn select_project(&self, project_id: &str) -> bool {
        let project = self
            .projects
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == project_id)
            .cloned();
        let Some(project) = project else {
            return false;
        };

        *self.active_project.write().unwrap() = Some(project_id.to_string());

        let active_id = self.active_conversation_id();
        {
            let mut conversations = self.conversations.write().unwrap();
            if let Some(conversation) = conversations.iter_mut().find(|c| c.id == active_id) {
                conversation.project_id = Some(project_id.to_string());
            }
        }
        self.append_status_message(
            &active_id,
            format!("Project selected: {}. {}", project.name, project.description),
        );
        true
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.read().unwrap().clone()
    }

    pub fn active_project(&self) -> Option<Project> {
        let id = self.active_project.read().unwrap().clone()?;
        self.projects
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    fn append_status_message(&self, conversation_id: &str, content: String) {
        let messages = self.store.append(conversation_id, Message::system(content));
        self.notify(conversation_id, messages);
    }
}
