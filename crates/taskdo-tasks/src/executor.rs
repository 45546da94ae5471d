//! Refresh-once request execution.
//!
//! A call rejected with 401 gets exactly one token refresh and one retry.
//! If the refresh fails or the retry is rejected again the error becomes
//! [`TasksError::ReauthRequired`] and nothing else is attempted.

use std::future::Future;
use std::sync::Arc;

use taskdo_auth::{TokenRefresher, UserAccount};

use crate::client::TasksClient;
use crate::error::TasksError;
use crate::types::{GoogleTask, GoogleTaskList, NewTask, TaskPatch};

/// Run `op` with the account's access token, refreshing once on 401.
///
/// `op` receives the token to use; a successful refresh updates `account`.
pub async fn with_token_refresh<R, F, Fut, T>(
    refresher: &R,
    account: &mut UserAccount,
    op: F,
) -> Result<T, TasksError>
where
    R: TokenRefresher,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, TasksError>>,
{
    match op(account.access_token.clone()).await {
        Err(TasksError::TokenExpired) => {}
        other => return other,
    }

    tracing::info!(account = %account.email, "Access token rejected, refreshing");
    let token = refresher
        .refresh_access_token(account)
        .await
        .map_err(|e| {
            tracing::warn!(account = %account.email, "Token refresh failed: {}", e);
            TasksError::ReauthRequired(e.to_string())
        })?;

    match op(token).await {
        Err(TasksError::TokenExpired) => {
            tracing::warn!(account = %account.email, "Refreshed token rejected");
            Err(TasksError::ReauthRequired(
                "access token rejected after refresh".to_string(),
            ))
        }
        other => other,
    }
}

/// Tasks API calls on behalf of one account.
pub struct AccountSession<R> {
    client: TasksClient,
    refresher: Arc<R>,
    account: UserAccount,
}

impl<R: TokenRefresher> AccountSession<R> {
    pub fn new(client: TasksClient, refresher: Arc<R>, account: UserAccount) -> Self {
        Self {
            client,
            refresher,
            account,
        }
    }

    /// The account, carrying any refreshed token.
    pub fn account(&self) -> &UserAccount {
        &self.account
    }

    pub fn into_account(self) -> UserAccount {
        self.account
    }

    pub async fn task_lists(&mut self) -> Result<Vec<GoogleTaskList>, TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.list_task_lists(&token).await
        })
        .await
    }

    pub async fn tasks(&mut self, list_id: &str) -> Result<Vec<GoogleTask>, TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.list_tasks(&token, list_id).await
        })
        .await
    }

    pub async fn create_task(
        &mut self,
        list_id: &str,
        task: &NewTask,
    ) -> Result<GoogleTask, TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.create_task(&token, list_id, task).await
        })
        .await
    }

    pub async fn update_task(
        &mut self,
        list_id: &str,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<GoogleTask, TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.update_task(&token, list_id, task_id, patch).await
        })
        .await
    }

    pub async fn delete_task(&mut self, list_id: &str, task_id: &str) -> Result<(), TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.delete_task(&token, list_id, task_id).await
        })
        .await
    }

    pub async fn move_to_top(&mut self, list_id: &str, task_id: &str) -> Result<GoogleTask, TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.move_task(&token, list_id, task_id, None, None).await
        })
        .await
    }

    pub async fn create_task_list(&mut self, title: &str) -> Result<GoogleTaskList, TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.create_task_list(&token, title).await
        })
        .await
    }

    pub async fn rename_task_list(
        &mut self,
        list_id: &str,
        title: &str,
    ) -> Result<GoogleTaskList, TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.update_task_list(&token, list_id, title).await
        })
        .await
    }

    pub async fn delete_task_list(&mut self, list_id: &str) -> Result<(), TasksError> {
        let client = &self.client;
        with_token_refresh(self.refresher.as_ref(), &mut self.account, |token| async move {
            client.delete_task_list(&token, list_id).await
        })
        .await
    }
}
