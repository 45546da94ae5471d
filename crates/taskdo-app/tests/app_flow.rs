//! End-to-end flows through the reducer, the effect runner and a mocked Google.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDate;
use taskdo_app::{AccountScope, Intent, NotificationKind, TaskApp};
use taskdo_auth::{AuthError, IdentityFlow, UserAccount};
use taskdo_core::{keys, Config, MemorySyncStore, SyncStore, SyncStoreExt};
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stands in for the browser: approves or declines the consent screen.
struct FakeBrowser {
    approve: bool,
}

impl IdentityFlow for FakeBrowser {
    fn redirect_uri(&self) -> String {
        "http://127.0.0.1:8085/callback".to_string()
    }

    async fn launch(&self, auth_url: &str) -> Result<Url, AuthError> {
        if !self.approve {
            return Ok(Url::parse("http://127.0.0.1:8085/callback?error=access_denied").unwrap());
        }
        let auth_url = Url::parse(auth_url).unwrap();
        let state = auth_url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        Ok(Url::parse_with_params(
            &self.redirect_uri(),
            &[("code", "auth-code"), ("state", state.as_str())],
        )
        .unwrap())
    }
}

fn config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.google.client_id = "client-123".to_string();
    config.relay.base_url = server.uri();
    config.tasks.base_url = server.uri();
    config.tasks.max_retries = 0;
    config.profile.people_url = format!("{}/people/me", server.uri());
    config
}

fn id_token(email: &str, name: &str) -> String {
    let claims = serde_json::json!({ "email": email, "name": name });
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("eyJhbGciOiJSUzI1NiJ9.{}.sig", payload)
}

fn stored_account(email: &str, token: &str) -> UserAccount {
    UserAccount {
        id: email.to_string(),
        email: email.to_string(),
        name: "Ada Lovelace".to_string(),
        picture: None,
        access_token: token.to_string(),
        refresh_token: Some("refresh-1".to_string()),
    }
}

async fn mount_exchange(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/exchange"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "refresh_token": "refresh-2",
            "id_token": id_token("ada@example.com", "Ada Lovelace")
        })))
        .mount(server)
        .await;
}

async fn mount_lists(server: &MockServer, token: &str, lists: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/users/@me/lists"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": lists })))
        .mount(server)
        .await;
}

async fn mount_tasks(server: &MockServer, list_id: &str, tasks: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/lists/{}/tasks", list_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": tasks })))
        .mount(server)
        .await;
}

fn messages(app: &mut TaskApp<FakeBrowser>) -> Vec<String> {
    app.take_notifications()
        .into_iter()
        .map(|n| n.message)
        .collect()
}

#[tokio::test]
async fn test_first_account_is_added_and_its_first_list_opened() {
    let server = MockServer::start().await;
    mount_exchange(&server, "access-1").await;
    mount_lists(
        &server,
        "access-1",
        serde_json::json!([
            { "id": "L1", "title": "My Tasks" },
            { "id": "L2", "title": "Errands" }
        ]),
    )
    .await;
    mount_tasks(
        &server,
        "L1",
        serde_json::json!([
            { "id": "t1", "title": "Pay rent", "status": "needsAction", "due": "2025-03-10T00:00:00.000Z" },
            { "id": "t2", "title": "Call Bob", "status": "completed", "completed": "2025-03-09T10:00:00.000Z" }
        ]),
    )
    .await;

    let store = Arc::new(MemorySyncStore::new());
    let mut app = TaskApp::from_config(&config(&server), store.clone(), FakeBrowser { approve: true });

    app.dispatch(Intent::Init).await;
    assert!(app.state().accounts.is_empty());
    assert_eq!(app.state().scope, None);

    app.dispatch(Intent::AddAccount).await;

    let state = app.state();
    assert_eq!(state.accounts.len(), 1);
    assert_eq!(state.accounts[0].email, "ada@example.com");
    assert_eq!(
        state.scope,
        Some(AccountScope::Account("ada@example.com".into()))
    );
    assert_eq!(state.current_list_id.as_deref(), Some("L1"));
    assert!(!state.is_loading());

    let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let view = app.view(today);
    assert_eq!(view.list.unwrap().title, "My Tasks");
    assert_eq!(view.active.len(), 1);
    assert_eq!(view.active[0].due_date(), Some(today));
    assert_eq!(view.completed.len(), 1);

    assert_eq!(
        store.get(keys::SAVED_ACCOUNT_ID).unwrap(),
        Some(serde_json::json!("ada@example.com"))
    );
    assert_eq!(
        store.get(keys::SAVED_TASK_LIST_ID).unwrap(),
        Some(serde_json::json!("L1"))
    );
    let stored: Vec<UserAccount> = store.get_json(keys::ACCOUNTS).unwrap().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].access_token, "access-1");

    let notifications = app.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Success);
}

#[tokio::test]
async fn test_completing_a_task_keeps_it_in_the_active_section() {
    let server = MockServer::start().await;
    mount_lists(&server, "tok", serde_json::json!([{ "id": "L1", "title": "My Tasks" }])).await;
    mount_tasks(
        &server,
        "L1",
        serde_json::json!([{ "id": "t1", "title": "Pay rent", "status": "needsAction" }]),
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path("/lists/L1/tasks/t1"))
        .and(body_partial_json(serde_json::json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "t1",
            "title": "Pay rent",
            "status": "completed",
            "completed": "2025-03-10T09:00:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySyncStore::new());
    store
        .set_json(keys::ACCOUNTS, &vec![stored_account("ada@example.com", "tok")])
        .unwrap();
    let mut app = TaskApp::from_config(&config(&server), store.clone(), FakeBrowser { approve: true });

    app.dispatch(Intent::Init).await;
    app.dispatch(Intent::ToggleTask {
        task_id: "t1".into(),
        completed: true,
    })
    .await;

    let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let view = app.view(today);
    assert_eq!(view.active.len(), 1);
    assert!(view.active[0].is_completed());
    assert!(view.completed.is_empty());

    app.dispatch(Intent::RefreshTasks).await;
    assert!(app.state().recently_completed.is_empty());
}

#[tokio::test]
async fn test_all_accounts_scope_merges_lists() {
    let server = MockServer::start().await;
    mount_lists(&server, "tok-a", serde_json::json!([{ "id": "LA", "title": "Work" }])).await;
    mount_lists(&server, "tok-b", serde_json::json!([{ "id": "LB", "title": "Home" }])).await;
    mount_tasks(&server, "LA", serde_json::json!([])).await;

    let store = Arc::new(MemorySyncStore::new());
    store
        .set_json(
            keys::ACCOUNTS,
            &vec![
                stored_account("a@example.com", "tok-a"),
                stored_account("b@example.com", "tok-b"),
            ],
        )
        .unwrap();
    let mut app = TaskApp::from_config(&config(&server), store.clone(), FakeBrowser { approve: true });

    app.dispatch(Intent::Init).await;

    let state = app.state();
    assert_eq!(state.scope, Some(AccountScope::All));
    let ids: Vec<&str> = state
        .visible_task_lists()
        .iter()
        .map(|list| list.id.as_str())
        .collect();
    assert_eq!(ids, vec!["LA", "LB"]);
    assert_eq!(state.current_list_id.as_deref(), Some("LA"));
    assert_eq!(
        store.get(keys::SAVED_ACCOUNT_ID).unwrap(),
        Some(serde_json::json!("ALL"))
    );

    app.dispatch(Intent::CreateList {
        title: "Groceries".into(),
    })
    .await;
    assert_eq!(messages(&mut app), vec!["Select an account to create a list"]);
}

#[tokio::test]
async fn test_expired_session_is_reauthenticated_and_load_retried() {
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
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_exchange(&server, "fresh").await;
    mount_lists(
        &server,
        "fresh",
        serde_json::json!([
            { "id": "L1", "title": "My Tasks" },
            { "id": "L2", "title": "Errands" }
        ]),
    )
    .await;
    mount_tasks(&server, "L2", serde_json::json!([])).await;

    let store = Arc::new(MemorySyncStore::new());
    store
        .set_json(keys::ACCOUNTS, &vec![stored_account("ada@example.com", "stale")])
        .unwrap();
    store.set_json(keys::SAVED_TASK_LIST_ID, "L2").unwrap();
    let mut app = TaskApp::from_config(&config(&server), store.clone(), FakeBrowser { approve: true });

    app.dispatch(Intent::Init).await;

    let state = app.state();
    assert!(state.reauth.is_none());
    assert_eq!(state.accounts.len(), 1);
    assert_eq!(state.accounts[0].access_token, "fresh");
    assert_eq!(state.accounts[0].refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(state.current_list_id.as_deref(), Some("L2"));
    assert!(state.tasks.contains_key("L2"));

    assert_eq!(
        messages(&mut app),
        vec![
            "Authentication expired. Re-authenticating...",
            "Successfully re-authenticated!"
        ]
    );
    let stored: Vec<UserAccount> = store.get_json(keys::ACCOUNTS).unwrap().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].access_token, "fresh");
}

#[tokio::test]
async fn test_cancelled_reauthentication_drops_the_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me/lists"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySyncStore::new());
    store
        .set_json(keys::ACCOUNTS, &vec![stored_account("ada@example.com", "stale")])
        .unwrap();
    let mut app = TaskApp::from_config(&config(&server), store.clone(), FakeBrowser { approve: false });

    app.dispatch(Intent::Init).await;

    assert!(app.state().accounts.is_empty());
    assert_eq!(app.state().current_list_id, None);
    assert_eq!(
        messages(&mut app),
        vec![
            "Authentication expired. Re-authenticating...",
            "Re-authentication was cancelled"
        ]
    );
    let stored: Vec<UserAccount> = store.get_json(keys::ACCOUNTS).unwrap().unwrap();
    assert!(stored.is_empty());
}
