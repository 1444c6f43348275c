//! Chat pipeline - wires session store, schema profiler, planner, executor,
//! and assembler into one request path.

use crate::agents::executor::ExecutorAgent;
use crate::agents::planner::PlannerAgent;
use crate::config::Settings;
use crate::engine::QueryEngine;
use crate::error::{DataRoomError, Result};
use crate::llm::TextGenerator;
use crate::response::{ChatResponse, ResponseAssembler};
use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ChatPipeline {
    store: Arc<SessionStore>,
    planner: PlannerAgent,
    executor: ExecutorAgent,
    assembler: ResponseAssembler,
    context_window: usize,
}

impl ChatPipeline {
    pub fn new(
        store: Arc<SessionStore>,
        llm: Arc<dyn TextGenerator>,
        engine: Arc<dyn QueryEngine>,
        settings: &Settings,
    ) -> Self {
        Self {
            store,
            planner: PlannerAgent::new(llm),
            executor: ExecutorAgent::new(engine, Duration::from_secs(settings.engine_timeout_secs)),
            assembler: ResponseAssembler,
            context_window: settings.context_window,
        }
    }

    /// Run one chat turn: plan, execute, assemble, record.
    ///
    /// An unknown session id is a request failure (`NotFound`). Planning and
    /// execution failures are converted into a structurally valid response
    /// with `success: false` - the session stays usable either way.
    pub async fn chat(&self, session_id: &str, question: &str) -> Result<ChatResponse> {
        let session = self.store.get(session_id).await?;

        // Serialize turns per session. The gate is held across the external
        // calls on purpose: request K+1 must see the history K produced.
        // Other sessions are untouched; the store map lock is not held here.
        let _turn_gate = session.gate().lock().await;

        let profile = session.dataset.profile()?;
        let history = self
            .store
            .recent_history(session_id, self.context_window)
            .await?;

        info!(session_id, question, "Processing chat turn");

        let plan = match self.planner.create_plan(profile, &history, question).await {
            Ok(plan) => plan,
            Err(e @ DataRoomError::Validation(_)) => return Err(e),
            Err(e) => {
                return Ok(self
                    .assembler
                    .assemble_failure(&self.store, session_id, question, None, e)
                    .await)
            }
        };

        match self.executor.execute(&session.dataset, &plan).await {
            Ok(outcome) => {
                self.assembler
                    .assemble_success(&self.store, session_id, question, plan, outcome)
                    .await
            }
            Err(e) => Ok(self
                .assembler
                .assemble_failure(&self.store, session_id, question, Some(plan), e)
                .await),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}
