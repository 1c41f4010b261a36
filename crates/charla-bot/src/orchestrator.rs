//! Message orchestration
//!
//! One entry point, [`Orchestrator::handle_message`], takes an incoming
//! message through route → execute → record. It is a total function: every
//! input produces a non-empty reply string, whatever the adapters, the
//! agent, or the backend do. Only the terminal fallback (everything
//! failed) skips the history write, so a broken turn never pollutes the
//! stored conversation.

use std::sync::Arc;

use charla_agent::{Agent, BoxedTool};
use charla_ai::{ChatBackend, Context, Message};

use crate::memory::{ConversationStore, Entry, Role, UserId};
use crate::router::{self, Route};

/// How many stored entries feed the chat context
const HISTORY_WINDOW: usize = 6;

/// Agent replies shorter than this are treated as degenerate
const MIN_AGENT_REPLY: usize = 10;

/// Terminal fallback when every path failed. Never recorded in history.
const FALLBACK_MESSAGE: &str =
    "Lo siento, tuve un problema al procesar tu mensaje. ¿Podrías intentarlo de nuevo?";

/// Reply for empty input
const EMPTY_INPUT_MESSAGE: &str = "✏️ Escríbeme algo y te respondo.";

/// Personality prompt for the plain-chat path
const SYSTEM_PROMPT: &str = "\
Eres un asistente conversacional amigable.

- Respondes de manera clara y concisa
- Eres educado y profesional
- Si no sabes algo, lo admites honestamente
- Usas emojis ocasionalmente para ser más amigable
- Mantienes respuestas de máximo 3-4 párrafos
- Respondes en español";

/// Wires the store, the chat backend, the agent, and the direct-path tools
/// into a single message handler. All dependencies are injected.
pub struct Orchestrator {
    store: Arc<ConversationStore>,
    backend: Arc<dyn ChatBackend>,
    agent: Agent,
    currency: BoxedTool,
    translation: BoxedTool,
}

impl Orchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        backend: Arc<dyn ChatBackend>,
        agent: Agent,
        currency: BoxedTool,
        translation: BoxedTool,
    ) -> Self {
        Self {
            store,
            backend,
            agent,
            currency,
            translation,
        }
    }

    /// Handle one incoming message and produce the reply text.
    ///
    /// Never fails; the worst outcome is the fixed fallback message.
    pub async fn handle_message(&self, user_id: UserId, user_name: &str, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return EMPTY_INPUT_MESSAGE.to_string();
        }

        let response = match router::classify(text) {
            Route::Currency { text } => {
                tracing::info!(user_id, "direct currency path");
                Some(self.direct_currency(&text).await)
            }
            Route::Translation { text } => {
                tracing::info!(user_id, "direct translation path");
                Some(self.direct_translation(&text).await)
            }
            Route::Agent { text } => {
                tracing::info!(user_id, "agent path");
                match self.run_agent(&text).await {
                    Some(reply) => Some(reply),
                    // Agent came up empty: same text through plain chat
                    None => self.chat_reply(user_id, user_name, &text).await,
                }
            }
            Route::Chat { text } => {
                tracing::info!(user_id, "chat path");
                self.chat_reply(user_id, user_name, &text).await
            }
        };

        match response {
            Some(reply) => {
                self.store.append(user_id, Role::User, text);
                self.store.append(user_id, Role::Assistant, reply.clone());
                reply
            }
            None => FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Clear a user's history and confirm
    pub fn reset(&self, user_id: UserId) -> String {
        self.store.clear(user_id);
        "🔄 Conversación reiniciada. Empezamos de cero.".to_string()
    }

    /// Memory counters for the `/stats` command
    pub fn stats(&self) -> crate::memory::StoreStats {
        self.store.stats()
    }

    /// Compact preview of a user's recent context
    pub fn context_summary(&self, user_id: UserId) -> String {
        self.store.context_summary(user_id, HISTORY_WINDOW)
    }

    async fn direct_currency(&self, text: &str) -> String {
        match router::parse_currency_query(text) {
            Ok(query) => {
                let args = serde_json::json!({
                    "amount": query.amount,
                    "from": query.from,
                    "to": query.to,
                });
                self.currency.execute(args).await.content
            }
            Err(e) => e.user_message(),
        }
    }

    async fn direct_translation(&self, text: &str) -> String {
        let query = router::parse_translation_query(text);
        let args = serde_json::json!({
            "text": query.text,
            "source": query.source,
            "target": query.target,
        });
        self.translation.execute(args).await.content
    }

    /// Run the agent; `None` means it produced nothing usable.
    async fn run_agent(&self, text: &str) -> Option<String> {
        match self.agent.run(text).await {
            Ok(reply) if reply.trim().len() >= MIN_AGENT_REPLY => Some(reply),
            Ok(reply) => {
                tracing::warn!(len = reply.trim().len(), "agent reply too short, falling back to chat");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "agent failed, falling back to chat");
                None
            }
        }
    }

    /// Plain contextual chat. `None` means the backend failed and the
    /// caller should emit the terminal fallback.
    async fn chat_reply(&self, user_id: UserId, user_name: &str, text: &str) -> Option<String> {
        let mut context = Context::with_system(format!(
            "{}\n\nEstás hablando con {}.",
            SYSTEM_PROMPT, user_name
        ));

        // Timed-out history is evicted lazily (on the next append), so a
        // returning user may still have stale entries stored. Never feed
        // those into the model.
        if self.store.has_recent_activity(user_id) {
            for entry in self.store.history(user_id, Some(HISTORY_WINDOW)) {
                context.push(entry_to_message(&entry));
            }
        } else {
            tracing::debug!(user_id, "no recent activity, starting fresh context");
        }
        context.push(Message::user(text));

        match self.backend.complete(&context).await {
            Ok(message) => {
                let reply = message.text();
                if reply.trim().is_empty() {
                    tracing::warn!("chat backend returned an empty reply");
                    None
                } else {
                    Some(reply)
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat backend failed");
                None
            }
        }
    }
}

fn entry_to_message(entry: &Entry) -> Message {
    match entry.role {
        Role::User => Message::user(entry.content.clone()),
        Role::Assistant => Message::assistant(entry.content.clone()),
    }
}
