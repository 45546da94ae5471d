//! Application state. Only the reducer mutates it.

use std::collections::{HashMap, HashSet};

use taskdo_auth::UserAccount;
use taskdo_tasks::{GoogleTask, GoogleTaskList};

use crate::intent::Retry;
use crate::settings::ExtensionSettings;

/// Stored value of the ALL-accounts selection.
pub const ALL_ACCOUNTS: &str = "ALL";

/// Which accounts the list picker shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountScope {
    All,
    Account(String),
}

impl AccountScope {
    pub fn from_saved(saved: &str) -> Self {
        if saved == ALL_ACCOUNTS {
            Self::All
        } else {
            Self::Account(saved.to_string())
        }
    }

    pub fn to_saved(&self) -> String {
        match self {
            Self::All => ALL_ACCOUNTS.to_string(),
            Self::Account(id) => id.clone(),
        }
    }
}

/// An account going through sign-in again after its token died.
#[derive(Debug, Clone, PartialEq)]
pub struct Reauth {
    pub account_id: String,
    pub email: String,
    /// Load to repeat once the same account is back.
    pub retry: Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub accounts: Vec<UserAccount>,
    pub scope: Option<AccountScope>,
    /// Task lists by account id, in server order.
    pub task_lists: HashMap<String, Vec<GoogleTaskList>>,
    pub current_list_id: Option<String>,
    /// Tasks by list id. List ids are unique across accounts.
    pub tasks: HashMap<String, Vec<GoogleTask>>,
    pub settings: ExtensionSettings,
    pub language: Option<String>,

    /// Completed this session; kept in the active section until refresh.
    pub recently_completed: HashSet<String>,
    pub editing_task_id: Option<String>,
    /// Inline validation message for the edit form.
    pub edit_error: Option<String>,

    pub startup_loaded: bool,
    /// Saved selections applied; the list selection may now be revalidated.
    pub selections_loaded: bool,
    pub reauth: Option<Reauth>,
    /// In-flight list and task loads.
    pub loading: u32,
    pub loading_tasks: HashSet<String>,
    /// Dismissible banner for task loading failures.
    pub error: Option<String>,
    pub notifications: Vec<Notification>,
}

impl AppState {
    pub fn account(&self, account_id: &str) -> Option<&UserAccount> {
        self.accounts.iter().find(|acc| acc.id == account_id)
    }

    /// The selected account, unless the scope is ALL.
    pub fn current_account(&self) -> Option<&UserAccount> {
        match &self.scope {
            Some(AccountScope::Account(id)) => self.account(id),
            _ => None,
        }
    }

    pub fn accounts_in_scope(&self) -> Vec<&UserAccount> {
        match &self.scope {
            Some(AccountScope::All) => self.accounts.iter().collect(),
            Some(AccountScope::Account(id)) => self.account(id).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Lists shown in the picker; in ALL scope the union of every account's
    /// lists without duplicate ids.
    pub fn visible_task_lists(&self) -> Vec<&GoogleTaskList> {
        let mut seen = HashSet::new();
        self.accounts_in_scope()
            .into_iter()
            .flat_map(|acc| self.task_lists.get(&acc.id).into_iter().flatten())
            .filter(|list| !list.id.is_empty() && seen.insert(list.id.as_str()))
            .collect()
    }

    /// Whether every account in scope has its lists loaded.
    pub fn scope_lists_loaded(&self) -> bool {
        let accounts = self.accounts_in_scope();
        !accounts.is_empty()
            && accounts
                .iter()
                .all(|acc| self.task_lists.contains_key(&acc.id))
    }

    pub fn account_for_list(&self, list_id: &str) -> Option<&UserAccount> {
        self.accounts.iter().find(|acc| {
            self.task_lists
                .get(&acc.id)
                .is_some_and(|lists| lists.iter().any(|list| list.id == list_id))
        })
    }

    pub fn find_list(&self, list_id: &str) -> Option<&GoogleTaskList> {
        self.task_lists
            .values()
            .flatten()
            .find(|list| list.id == list_id)
    }

    pub fn current_list(&self) -> Option<&GoogleTaskList> {
        let id = self.current_list_id.as_deref()?;
        self.visible_task_lists().into_iter().find(|list| list.id == id)
    }

    /// The first list the API returned for the owning account is its default.
    pub fn is_default_list(&self, list_id: &str) -> bool {
        self.account_for_list(list_id)
            .and_then(|acc| self.task_lists.get(&acc.id))
            .and_then(|lists| lists.iter().find(|list| !list.id.is_empty()))
            .is_some_and(|first| first.id == list_id)
    }

    pub fn current_tasks(&self) -> &[GoogleTask] {
        self.current_list_id
            .as_ref()
            .and_then(|id| self.tasks.get(id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading > 0
    }

    pub fn notify_success(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification {
            kind: NotificationKind::Success,
            message: message.into(),
        });
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Error notification: {}", message);
        self.notifications.push(Notification {
            kind: NotificationKind::Error,
            message,
        });
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
