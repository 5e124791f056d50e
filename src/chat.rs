//! Chat-facing entry points
//!
//! [`ChatService`] is what a chat transport talks to. It owns session
//! identities, keeps the visible history in a [`SessionStore`], and turns every
//! run failure into a fixed apology so the user always gets a text reply.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::items::Message;
use crate::runner::{Orchestrator, RunOutcome};
use crate::session::{SessionId, SessionStore};

/// Reply sent whenever a run fails. Error details go to the log only.
pub const GENERIC_FAILURE: &str =
    "Sorry, something went wrong while working on your request. Please try again.";

pub fn welcome_message(model: &str) -> String {
    format!("Hello! I'm the {} SEO Agent. How can I help?", model)
}

pub struct ChatService {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn SessionStore>,
    model: String,
}

impl ChatService {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn SessionStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            model: model.into(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Open a new session and produce its greeting.
    pub fn on_session_start(&self) -> (SessionId, String) {
        let id = SessionId::new_random();
        info!(session = %id, "Session started");
        (id, welcome_message(&self.model))
    }

    /// Handle one user message; always returns text.
    pub async fn on_message(&self, session: &SessionId, text: &str) -> String {
        match self.respond(session, text).await {
            Ok(outcome) => outcome.final_output,
            Err(_) => GENERIC_FAILURE.to_string(),
        }
    }

    /// Like [`on_message`](Self::on_message) but exposes the run outcome.
    ///
    /// The history gets the user entry before the run and exactly one
    /// assistant entry after it, the apology included when the run fails.
    pub async fn respond(&self, session: &SessionId, text: &str) -> Result<RunOutcome> {
        let history = self.store.get(session).await?;
        self.store.append(session, Message::user(text)).await?;

        let result = self.orchestrator.run(&history, text).await;
        let reply = match &result {
            Ok(outcome) => outcome.final_output.clone(),
            Err(err) => {
                error!(session = %session, error = %err, "Replying with generic failure");
                GENERIC_FAILURE.to_string()
            }
        };

        if let Err(err) = self.store.append(session, Message::assistant(reply)).await {
            warn!(session = %session, error = %err, "Failed to store assistant reply");
            return Err(err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::model::ScriptedProvider;
    use crate::registry::RegistryBuilder;
    use crate::runner::RunConfig;
    use crate::session::InMemorySessionStore;
    use crate::tool::ToolRegistry;
    use pretty_assertions::assert_eq;

    fn service(provider: ScriptedProvider) -> (ChatService, Arc<InMemorySessionStore>) {
        let registry = RegistryBuilder::new(ToolRegistry::new())
            .agent(Agent::simple("Writer", "write"))
            .entry("Writer")
            .build()
            .unwrap();
        let orchestrator = Orchestrator::new(
            Arc::new(registry),
            Arc::new(provider),
            RunConfig::default(),
        );
        let store = Arc::new(InMemorySessionStore::new());
        let service = ChatService::new(Arc::new(orchestrator), store.clone(), "gpt-4o-mini");
        (service, store)
    }

    #[test]
    fn test_welcome_message() {
        let (service, _) = service(ScriptedProvider::new());
        let (_, welcome) = service.on_session_start();
        assert_eq!(welcome, "Hello! I'm the gpt-4o-mini SEO Agent. How can I help?");
    }

    #[tokio::test]
    async fn test_on_message_appends_user_and_assistant() {
        let (service, store) = service(ScriptedProvider::new().with_message("post"));
        let (id, _) = service.on_session_start();

        assert_eq!(service.on_message(&id, "Mastela swing").await, "post");
        assert_eq!(
            store.get(&id).await.unwrap(),
            vec![Message::user("Mastela swing"), Message::assistant("post")]
        );
    }

    #[tokio::test]
    async fn test_failure_returns_apology() {
        let (service, store) = service(ScriptedProvider::new().with_failure("boom"));
        let (id, _) = service.on_session_start();

        let reply = service.on_message(&id, "hi").await;
        assert_eq!(reply, GENERIC_FAILURE);
        assert!(!reply.contains("boom"));
        let history = store.get(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], Message::assistant(GENERIC_FAILURE));
    }
}
