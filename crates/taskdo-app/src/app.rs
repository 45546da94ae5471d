//! The dispatch loop tying the reducer to the effect runner.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::NaiveDate;
use taskdo_auth::{AuthService, AuthSettings, IdentityFlow};
use taskdo_core::{Config, SyncStore};
use taskdo_tasks::{RetryConfig, TasksClient};
use tokio::task::JoinSet;

use crate::intent::Intent;
use crate::runner::EffectRunner;
use crate::state::{AppState, Notification};
use crate::update::update;
use crate::view::TaskView;

/// A headless taskdo session.
pub struct TaskApp<F> {
    state: AppState,
    runner: EffectRunner<F>,
}

impl<F: IdentityFlow + 'static> TaskApp<F> {
    pub fn new(runner: EffectRunner<F>) -> Self {
        Self {
            state: AppState::default(),
            runner,
        }
    }

    /// Wire the services described by `config` over `store`.
    pub fn from_config(config: &Config, store: Arc<dyn SyncStore>, identity: F) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthSettings::from_config(config),
            Arc::clone(&store),
            identity,
        ));
        let retry = RetryConfig {
            max_retries: config.tasks.max_retries,
            ..RetryConfig::default()
        };
        let tasks = TasksClient::new(&config.tasks.base_url, config.tasks.page_size, retry);
        Self::new(EffectRunner::new(auth, tasks, store))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.state.take_notifications()
    }

    /// The selected list as it should be rendered on `today`.
    pub fn view(&self, today: NaiveDate) -> TaskView<'_> {
        TaskView::build(
            self.state.current_list(),
            self.state.current_tasks(),
            &self.state.recently_completed,
            &self.state.settings,
            today,
        )
    }

    /// Reduce `intent`, then keep running effects and reducing their results
    /// until nothing is left in flight.
    ///
    /// Effects run concurrently; their results are reduced one at a time in
    /// completion order.
    pub async fn dispatch(&mut self, intent: Intent) {
        let mut pending = VecDeque::from([intent]);
        let mut running = JoinSet::new();

        loop {
            while let Some(intent) = pending.pop_front() {
                for effect in update(&mut self.state, intent) {
                    let runner = self.runner.clone();
                    running.spawn(async move { runner.run(effect).await });
                }
            }

            match running.join_next().await {
                Some(Ok(Some(intent))) => pending.push_back(intent),
                Some(Ok(None)) => {}
                Some(Err(e)) => tracing::error!("Effect task failed: {}", e),
                None => break,
            }
        }
    }
}
