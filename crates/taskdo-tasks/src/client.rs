//! Google Tasks API client.
//!
//! Every call takes the bearer token explicitly so the refresh-once executor
//! can retry with a new one.

use reqwest::RequestBuilder;
use tracing::instrument;

use crate::error::TasksError;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{GoogleTask, GoogleTaskList, NewTask, Page, TaskPatch};

pub const TASKS_API_BASE: &str = "https://tasks.googleapis.com/tasks/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct TasksClient {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    retry: RetryConfig,
}

impl Default for TasksClient {
    fn default() -> Self {
        Self::new(TASKS_API_BASE, DEFAULT_PAGE_SIZE, RetryConfig::default())
    }
}

impl TasksClient {
    pub fn new(base_url: &str, page_size: u32, retry: RetryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: page_size.clamp(1, 100),
            retry,
        }
    }

    fn lists_url(&self) -> String {
        format!("{}/users/@me/lists", self.base_url)
    }

    fn list_url(&self, list_id: &str) -> String {
        format!("{}/{}", self.lists_url(), urlencoding::encode(list_id))
    }

    fn tasks_url(&self, list_id: &str) -> String {
        format!("{}/lists/{}/tasks", self.base_url, urlencoding::encode(list_id))
    }

    fn task_url(&self, list_id: &str, task_id: &str) -> String {
        format!("{}/{}", self.tasks_url(list_id), urlencoding::encode(task_id))
    }

    /// All task lists of the account, following the page cursor.
    #[instrument(skip(self, token), level = "info")]
    pub async fn list_task_lists(&self, token: &str) -> Result<Vec<GoogleTaskList>, TasksError> {
        let url = self.lists_url();
        let mut lists = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: Page<GoogleTaskList> = self
                .fetch(|| {
                    let mut request = self
                        .client
                        .get(&url)
                        .bearer_auth(token)
                        .query(&[("maxResults", self.page_size.to_string())]);
                    if let Some(pt) = &page_token {
                        request = request.query(&[("pageToken", pt)]);
                    }
                    request
                })
                .await?;

            lists.extend(page.items);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} task lists", lists.len());
        Ok(lists)
    }

    /// All tasks of a list, including completed and hidden ones, in server order.
    #[instrument(skip(self, token), level = "info")]
    pub async fn list_tasks(&self, token: &str, list_id: &str) -> Result<Vec<GoogleTask>, TasksError> {
        let url = self.tasks_url(list_id);
        let mut tasks = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            pages += 1;
            let page: Page<GoogleTask> = self
                .fetch(|| {
                    let mut request = self.client.get(&url).bearer_auth(token).query(&[
                        ("maxResults", self.page_size.to_string()),
                        ("showCompleted", "true".to_string()),
                        ("showHidden", "true".to_string()),
                    ]);
                    if let Some(pt) = &page_token {
                        request = request.query(&[("pageToken", pt)]);
                    }
                    request
                })
                .await?;

            tasks.extend(page.items);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} tasks in {} pages", tasks.len(), pages);
        Ok(tasks)
    }

    #[instrument(skip(self, token, task), level = "info")]
    pub async fn create_task(
        &self,
        token: &str,
        list_id: &str,
        task: &NewTask,
    ) -> Result<GoogleTask, TasksError> {
        let url = self.tasks_url(list_id);
        self.fetch_once(|| self.client.post(&url).bearer_auth(token).json(task))
            .await
    }

    #[instrument(skip(self, token, patch), level = "info")]
    pub async fn update_task(
        &self,
        token: &str,
        list_id: &str,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<GoogleTask, TasksError> {
        let url = self.task_url(list_id, task_id);
        self.fetch(|| self.client.patch(&url).bearer_auth(token).json(patch))
            .await
    }

    #[instrument(skip(self, token), level = "info")]
    pub async fn delete_task(
        &self,
        token: &str,
        list_id: &str,
        task_id: &str,
    ) -> Result<(), TasksError> {
        let url = self.task_url(list_id, task_id);
        self.execute(|| self.client.delete(&url).bearer_auth(token))
            .await
    }

    /// Move a task under `parent` after `previous`; both `None` moves it to the top.
    #[instrument(skip(self, token), level = "info")]
    pub async fn move_task(
        &self,
        token: &str,
        list_id: &str,
        task_id: &str,
        parent: Option<&str>,
        previous: Option<&str>,
    ) -> Result<GoogleTask, TasksError> {
        let url = format!("{}/move", self.task_url(list_id, task_id));
        let mut params = Vec::new();
        if let Some(parent) = parent {
            params.push(("parent", parent));
        }
        if let Some(previous) = previous {
            params.push(("previous", previous));
        }

        self.fetch_once(|| self.client.post(&url).bearer_auth(token).query(&params))
            .await
    }

    #[instrument(skip(self, token), level = "info")]
    pub async fn create_task_list(
        &self,
        token: &str,
        title: &str,
    ) -> Result<GoogleTaskList, TasksError> {
        let url = self.lists_url();
        let body = serde_json::json!({ "title": title });
        self.fetch_once(|| self.client.post(&url).bearer_auth(token).json(&body))
            .await
    }

    #[instrument(skip(self, token), level = "info")]
    pub async fn update_task_list(
        &self,
        token: &str,
        list_id: &str,
        title: &str,
    ) -> Result<GoogleTaskList, TasksError> {
        let url = self.list_url(list_id);
        let body = serde_json::json!({ "title": title });
        self.fetch(|| self.client.patch(&url).bearer_auth(token).json(&body))
            .await
    }

    #[instrument(skip(self, token), level = "info")]
    pub async fn delete_task_list(&self, token: &str, list_id: &str) -> Result<(), TasksError> {
        let url = self.list_url(list_id);
        self.execute(|| self.client.delete(&url).bearer_auth(token))
            .await
    }

    async fn send<F>(&self, retry: &RetryConfig, request: F) -> Result<reqwest::Response, TasksError>
    where
        F: Fn() -> RequestBuilder,
    {
        Ok(with_retry(retry, || request().send()).await?)
    }

    async fn fetch<T, F>(&self, request: F) -> Result<T, TasksError>
    where
        T: serde::de::DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        self.fetch_with(&self.retry, request).await
    }

    /// For POSTs, which must not be sent twice.
    async fn fetch_once<T, F>(&self, request: F) -> Result<T, TasksError>
    where
        T: serde::de::DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        self.fetch_with(&RetryConfig::none(), request).await
    }

    async fn fetch_with<T, F>(&self, retry: &RetryConfig, request: F) -> Result<T, TasksError>
    where
        T: serde::de::DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let response = self.send(retry, request).await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| TasksError::InvalidData(format!("JSON parse error: {}", e)))
    }

    /// For calls that answer with an empty body.
    async fn execute<F>(&self, request: F) -> Result<(), TasksError>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = self.send(&self.retry, request).await?;
        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TasksError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 => Err(TasksError::TokenExpired),
        403 => Err(TasksError::Forbidden(response.text().await.unwrap_or_default())),
        404 => Err(TasksError::NotFound(response.text().await.unwrap_or_default())),
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(TasksError::RateLimited(retry_after))
        }
        code => {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!("Tasks API returned {}: {}", status, message);
            Err(TasksError::Api {
                status: code,
                message,
            })
        }
    }
}
