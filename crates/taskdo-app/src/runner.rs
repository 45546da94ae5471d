//! Executes effects and turns their outcomes back into intents.

use std::sync::Arc;

use taskdo_auth::{AuthService, IdentityFlow, UserAccount};
use taskdo_core::{keys, StorageError, SyncStore, SyncStoreExt};
use taskdo_tasks::{AccountSession, TasksClient};

use crate::intent::{AuthPurpose, Effect, Intent, Startup};
use crate::settings::ExtensionSettings;

/// Runs effects against the auth service, the Tasks API and the synced store.
pub struct EffectRunner<F> {
    auth: Arc<AuthService<F>>,
    tasks: TasksClient,
    store: Arc<dyn SyncStore>,
}

impl<F> Clone for EffectRunner<F> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            tasks: self.tasks.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<F: IdentityFlow> EffectRunner<F> {
    pub fn new(auth: Arc<AuthService<F>>, tasks: TasksClient, store: Arc<dyn SyncStore>) -> Self {
        Self { auth, tasks, store }
    }

    /// Execute one effect. Storage writes never produce an intent.
    pub async fn run(&self, mut effect: Effect) -> Option<Intent> {
        while let Effect::Delayed { delay, effect: inner } = effect {
            tokio::time::sleep(delay).await;
            effect = *inner;
        }

        match effect {
            Effect::LoadStartup => Some(Intent::StartupLoaded(self.load_startup())),
            Effect::Authenticate(purpose) => {
                if let AuthPurpose::Reauthenticate { account_id } = &purpose {
                    if let Err(e) = self.auth.remove_account(account_id) {
                        tracing::warn!("Failed to forget expired account: {}", e);
                    }
                }
                let result = self.auth.authenticate_account().await;
                Some(Intent::AuthCompleted { purpose, result })
            }
            Effect::ForgetAccount { account_id } => {
                if let Err(e) = self.auth.remove_account(&account_id) {
                    tracing::warn!("Failed to remove account: {}", e);
                }
                None
            }
            Effect::PersistAccounts(accounts) => {
                log_write(keys::ACCOUNTS, self.auth.accounts().save_all(&accounts));
                None
            }
            Effect::PersistSettings(settings) => {
                log_write(keys::SETTINGS, self.store.set_json(keys::SETTINGS, &settings));
                None
            }
            Effect::PersistScope(scope) => {
                let result = self.store.set_json(keys::SAVED_ACCOUNT_ID, &scope.to_saved());
                log_write(keys::SAVED_ACCOUNT_ID, result);
                None
            }
            Effect::PersistListSelection(list_id) => {
                let result = match list_id {
                    Some(id) => self.store.set_json(keys::SAVED_TASK_LIST_ID, &id),
                    None => self.store.remove(keys::SAVED_TASK_LIST_ID),
                };
                log_write(keys::SAVED_TASK_LIST_ID, result);
                None
            }
            Effect::PersistLanguage(language) => {
                log_write(keys::LANGUAGE, self.store.set_json(keys::LANGUAGE, &language));
                None
            }
            Effect::LoadTaskLists { account } => {
                let mut session = self.session(account);
                let result = session.task_lists().await;
                Some(Intent::ListsLoaded {
                    account: session.into_account(),
                    result,
                })
            }
            Effect::LoadTasks { account, list_id } => {
                let mut session = self.session(account);
                let result = session.tasks(&list_id).await;
                Some(Intent::TasksLoaded {
                    account: session.into_account(),
                    list_id,
                    result,
                })
            }
            Effect::CreateTask {
                account,
                list_id,
                task,
            } => {
                let mut session = self.session(account);
                let result = session.create_task(&list_id, &task).await;
                Some(Intent::TaskCreated {
                    account: session.into_account(),
                    list_id,
                    result,
                })
            }
            Effect::UpdateTask {
                account,
                list_id,
                patch,
                previous,
                kind,
            } => {
                let mut session = self.session(account);
                let result = session.update_task(&list_id, &previous.id, &patch).await;
                Some(Intent::TaskUpdated {
                    account: session.into_account(),
                    list_id,
                    previous,
                    kind,
                    result,
                })
            }
            Effect::DeleteTask {
                account,
                list_id,
                task,
                index,
            } => {
                let mut session = self.session(account);
                let result = session.delete_task(&list_id, &task.id).await;
                Some(Intent::TaskDeleted {
                    account: session.into_account(),
                    list_id,
                    task,
                    index,
                    result,
                })
            }
            Effect::MoveToTop {
                account,
                list_id,
                task_id,
            } => {
                let mut session = self.session(account);
                let result = session.move_to_top(&list_id, &task_id).await;
                Some(Intent::TaskMoved {
                    account: session.into_account(),
                    list_id,
                    task_id,
                    result,
                })
            }
            Effect::CreateList { account, title } => {
                let mut session = self.session(account);
                let result = session.create_task_list(&title).await;
                Some(Intent::ListCreated {
                    account: session.into_account(),
                    result,
                })
            }
            Effect::RenameList {
                account,
                previous,
                title,
            } => {
                let mut session = self.session(account);
                let result = session.rename_task_list(&previous.id, &title).await;
                Some(Intent::ListRenamed {
                    account: session.into_account(),
                    previous,
                    result,
                })
            }
            Effect::DeleteList {
                account,
                list,
                index,
                tasks,
                was_current,
            } => {
                let mut session = self.session(account);
                let result = session.delete_task_list(&list.id).await;
                Some(Intent::ListDeleted {
                    account: session.into_account(),
                    list,
                    index,
                    tasks,
                    was_current,
                    result,
                })
            }
            // Unwrapped above.
            Effect::Delayed { .. } => None,
        }
    }

    fn session(&self, account: UserAccount) -> AccountSession<AuthService<F>> {
        AccountSession::new(self.tasks.clone(), Arc::clone(&self.auth), account)
    }

    /// Read everything persisted. Unreadable values fall back to defaults.
    fn load_startup(&self) -> Startup {
        let accounts = self.auth.accounts().load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load accounts: {}", e);
            Vec::new()
        });

        let settings = match self.store.get_json::<ExtensionSettings>(keys::SETTINGS) {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings: {}", e);
                ExtensionSettings::default()
            }
        };

        Startup {
            accounts,
            settings,
            saved_account_id: self.read_string(keys::SAVED_ACCOUNT_ID),
            saved_list_id: self.read_string(keys::SAVED_TASK_LIST_ID),
            language: self.read_string(keys::LANGUAGE),
        }
    }

    fn read_string(&self, key: &str) -> Option<String> {
        match self.store.get_json::<String>(key) {
            Ok(value) => value.filter(|value| !value.is_empty()),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", key, e);
                None
            }
        }
    }
}

/// Storage writes are best effort.
fn log_write(key: &str, result: Result<(), StorageError>) {
    if let Err(e) = result {
        tracing::warn!("Failed to persist {}: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::time::Duration;
    use taskdo_auth::{AuthError, AuthSettings};
    use taskdo_core::{Config, MemorySyncStore};
    use taskdo_tasks::RetryConfig;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::settings::SortMode;
    use crate::state::AccountScope;

    struct NoBrowser;

    impl IdentityFlow for NoBrowser {
        fn redirect_uri(&self) -> String {
            "http://127.0.0.1:8085/callback".to_string()
        }

        async fn launch(&self, _auth_url: &str) -> Result<Url, AuthError> {
            Err(AuthError::Cancelled)
        }
    }

    fn account() -> UserAccount {
        UserAccount {
            id: "ada@x.com".to_string(),
            email: "ada@x.com".to_string(),
            name: "Ada".to_string(),
            picture: None,
            access_token: "stale".to_string(),
            refresh_token: Some("refresh".to_string()),
        }
    }

    fn runner(server: Option<&MockServer>) -> (EffectRunner<NoBrowser>, Arc<MemorySyncStore>) {
        let store = Arc::new(MemorySyncStore::new());
        let mut settings = AuthSettings::from_config(&Config::default());
        let mut tasks = TasksClient::default();
        if let Some(server) = server {
            settings.relay_url = server.uri();
            settings.tasks_api_url = server.uri();
            tasks = TasksClient::new(&server.uri(), 100, RetryConfig::none());
        }
        let auth = Arc::new(AuthService::new(settings, store.clone(), NoBrowser));
        (EffectRunner::new(auth, tasks, store.clone()), store)
    }

    #[tokio::test]
    async fn test_persist_effects_write_store() {
        let (runner, store) = runner(None);

        assert!(runner
            .run(Effect::PersistScope(AccountScope::All))
            .await
            .is_none());
        runner
            .run(Effect::PersistListSelection(Some("L1".into())))
            .await;
        runner
            .run(Effect::PersistSettings(ExtensionSettings {
                sort_by: SortMode::Date,
                ..ExtensionSettings::default()
            }))
            .await;

        assert_eq!(
            store.get(keys::SAVED_ACCOUNT_ID).unwrap(),
            Some(serde_json::json!("ALL"))
        );
        assert_eq!(
            store.get(keys::SETTINGS).unwrap().unwrap()["sortBy"],
            serde_json::json!("date")
        );

        runner.run(Effect::PersistListSelection(None)).await;
        assert_eq!(store.get(keys::SAVED_TASK_LIST_ID).unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_startup_reads_saved_values() {
        let (runner, store) = runner(None);
        store
            .set_json(keys::ACCOUNTS, &vec![account()])
            .unwrap();
        store
            .set(keys::SETTINGS, serde_json::json!({ "sortBy": "title" }))
            .unwrap();
        store.set_json(keys::SAVED_ACCOUNT_ID, "ada@x.com").unwrap();
        store.set_json(keys::SAVED_TASK_LIST_ID, "").unwrap();

        let Some(Intent::StartupLoaded(startup)) = runner.run(Effect::LoadStartup).await else {
            panic!("expected startup");
        };

        assert_eq!(startup.accounts, vec![account()]);
        assert_eq!(startup.settings.sort_by, SortMode::Title);
        assert!(startup.settings.show_completed_tasks);
        assert_eq!(startup.saved_account_id.as_deref(), Some("ada@x.com"));
        assert_eq!(startup.saved_list_id, None);
        assert_eq!(startup.language, None);
    }

    #[tokio::test]
    async fn test_malformed_settings_fall_back_to_defaults() {
        let (runner, store) = runner(None);
        store
            .set(keys::SETTINGS, serde_json::json!({ "sortBy": 42 }))
            .unwrap();

        let Some(Intent::StartupLoaded(startup)) = runner.run(Effect::LoadStartup).await else {
            panic!("expected startup");
        };
        assert_eq!(startup.settings, ExtensionSettings::default());
    }

    #[tokio::test]
    async fn test_load_lists_returns_refreshed_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me/lists"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/@me/lists"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{ "id": "L1", "title": "My Tasks" }]
            })))
            .mount(&server)
            .await;

        let (runner, store) = runner(Some(&server));
        store.set_json(keys::ACCOUNTS, &vec![account()]).unwrap();

        let intent = runner
            .run(Effect::LoadTaskLists { account: account() })
            .await;
        let Some(Intent::ListsLoaded { account, result }) = intent else {
            panic!("expected lists");
        };

        assert_eq!(account.access_token, "fresh");
        assert_eq!(result.unwrap()[0].title, "My Tasks");
        let stored: Vec<UserAccount> = store.get_json(keys::ACCOUNTS).unwrap().unwrap();
        assert_eq!(stored[0].access_token, "fresh");
    }

    #[tokio::test]
    async fn test_reauthenticate_forgets_account_first() {
        let (runner, store) = runner(None);
        store.set_json(keys::ACCOUNTS, &vec![account()]).unwrap();

        let intent = runner
            .run(Effect::Authenticate(AuthPurpose::Reauthenticate {
                account_id: "ada@x.com".into(),
            }))
            .await;

        let Some(Intent::AuthCompleted { result, .. }) = intent else {
            panic!("expected auth result");
        };
        assert!(result.unwrap_err().is_cancelled());
        let stored: Vec<UserAccount> = store.get_json(keys::ACCOUNTS).unwrap().unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_delayed_effect_runs_after_delay() {
        let (runner, store) = runner(None);
        let started = std::time::Instant::now();

        runner
            .run(Effect::Delayed {
                delay: Duration::from_millis(50),
                effect: Box::new(Effect::PersistLanguage("de".into())),
            })
            .await;

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(
            store.get(keys::LANGUAGE).unwrap(),
            Some(serde_json::json!("de"))
        );
    }
}
