//! Task list loading, selection and list CRUD.

use std::time::Duration;

use taskdo_auth::UserAccount;
use taskdo_tasks::{GoogleTask, GoogleTaskList, TasksError};

use super::accounts::begin_reauth;
use super::{load_tasks, revalidate_selection, set_current_list, sync_account};
use crate::intent::{Effect, Retry};
use crate::state::{AccountScope, AppState};

/// Wait before reloading lists after the server reported one missing.
const STALE_LIST_REFRESH_DELAY: Duration = Duration::from_secs(1);

pub(super) fn lists_loaded(
    state: &mut AppState,
    account: UserAccount,
    result: Result<Vec<GoogleTaskList>, TasksError>,
) -> Vec<Effect> {
    state.loading = state.loading.saturating_sub(1);
    if state.account(&account.id).is_none() {
        tracing::debug!("Dropping lists of a removed account");
        return Vec::new();
    }
    sync_account(state, &account);

    match result {
        Ok(lists) => {
            tracing::info!(account = %account.email, count = lists.len(), "Loaded task lists");
            let previous = state.task_lists.insert(account.id.clone(), lists);
            for gone in previous.unwrap_or_default() {
                if state.find_list(&gone.id).is_none() {
                    state.tasks.remove(&gone.id);
                }
            }
        }
        Err(e) if e.requires_reauth() => return begin_reauth(state, &account, Retry::TaskLists),
        Err(e) => {
            tracing::warn!(account = %account.email, "Failed to load task lists: {}", e);
            state.task_lists.entry(account.id.clone()).or_default();
            state.notify_error("Failed to load task lists");
        }
    }

    revalidate_selection(state)
}

pub(super) fn select_list(state: &mut AppState, list_id: String) -> Vec<Effect> {
    if !state
        .visible_task_lists()
        .iter()
        .any(|list| list.id == list_id)
    {
        tracing::warn!("Ignoring selection of unknown list {}", list_id);
        return Vec::new();
    }

    let mut effects = set_current_list(state, Some(list_id.clone()));
    effects.extend(load_tasks(state, &list_id));
    effects
}

pub(super) fn create_list(state: &mut AppState, title: &str) -> Vec<Effect> {
    if state.scope == Some(AccountScope::All) {
        state.notify_error("Select an account to create a list");
        return Vec::new();
    }
    let Some(account) = state.current_account().cloned() else {
        state.notify_error("No account selected");
        return Vec::new();
    };
    let title = title.trim();
    if title.is_empty() {
        return Vec::new();
    }

    vec![Effect::CreateList {
        account,
        title: title.to_string(),
    }]
}

pub(super) fn list_created(
    state: &mut AppState,
    account: UserAccount,
    result: Result<GoogleTaskList, TasksError>,
) -> Vec<Effect> {
    sync_account(state, &account);
    match result {
        Ok(list) => {
            tracing::info!(account = %account.email, "Created task list {}", list.id);
            state.notify_success(format!("List \"{}\" created", list.title));
            state.tasks.insert(list.id.clone(), Vec::new());
            let list_id = list.id.clone();
            state
                .task_lists
                .entry(account.id)
                .or_default()
                .push(list);
            set_current_list(state, Some(list_id))
        }
        Err(e) => {
            tracing::warn!("Failed to create task list: {}", e);
            state.notify_error("Failed to create list. Please try again.");
            Vec::new()
        }
    }
}

pub(super) fn rename_list(state: &mut AppState, list_id: &str, title: &str) -> Vec<Effect> {
    let title = title.trim();
    if title.is_empty() {
        return Vec::new();
    }
    let Some(account) = state.account_for_list(list_id).cloned() else {
        return Vec::new();
    };
    let Some(list) = list_mut(state, &account.id, list_id) else {
        return Vec::new();
    };
    if list.title == title {
        return Vec::new();
    }

    let previous = list.clone();
    list.title = title.to_string();
    vec![Effect::RenameList {
        account,
        previous,
        title: title.to_string(),
    }]
}

pub(super) fn list_renamed(
    state: &mut AppState,
    account: UserAccount,
    previous: GoogleTaskList,
    result: Result<GoogleTaskList, TasksError>,
) -> Vec<Effect> {
    sync_account(state, &account);
    match result {
        Ok(renamed) => {
            if let Some(list) = list_mut(state, &account.id, &renamed.id) {
                *list = renamed;
            }
            state.notify_success("List renamed");
        }
        Err(e) => {
            tracing::warn!("Failed to rename task list {}: {}", previous.id, e);
            if let Some(list) = list_mut(state, &account.id, &previous.id) {
                *list = previous;
            }
            state.notify_error("Failed to rename list. Please try again.");
        }
    }
    Vec::new()
}

pub(super) fn delete_list(state: &mut AppState, list_id: &str) -> Vec<Effect> {
    if state.is_default_list(list_id) {
        state.notify_error("The default list cannot be deleted");
        return Vec::new();
    }
    let Some(account) = state.account_for_list(list_id).cloned() else {
        return Vec::new();
    };
    let Some(lists) = state.task_lists.get_mut(&account.id) else {
        return Vec::new();
    };
    let Some(index) = lists.iter().position(|list| list.id == list_id) else {
        return Vec::new();
    };

    let list = lists.remove(index);
    let first_remaining = lists
        .iter()
        .find(|list| !list.id.is_empty())
        .map(|list| list.id.clone());
    let tasks = state.tasks.remove(list_id);
    let was_current = state.current_list_id.as_deref() == Some(list_id);

    let mut effects = Vec::new();
    if was_current {
        effects.extend(set_current_list(state, first_remaining.clone()));
        if let Some(next) = first_remaining {
            if !state.tasks.contains_key(&next) {
                effects.extend(load_tasks(state, &next));
            }
        }
    }
    effects.push(Effect::DeleteList {
        account,
        list,
        index,
        tasks,
        was_current,
    });
    effects
}

pub(super) fn list_deleted(
    state: &mut AppState,
    account: UserAccount,
    list: GoogleTaskList,
    index: usize,
    tasks: Option<Vec<GoogleTask>>,
    was_current: bool,
    result: Result<(), TasksError>,
) -> Vec<Effect> {
    sync_account(state, &account);
    match result {
        Ok(()) => {
            tracing::info!("Deleted task list {}", list.id);
            state.notify_success(format!("List \"{}\" deleted", list.title));
            Vec::new()
        }
        Err(e) if e.is_not_found() => {
            tracing::info!("Task list {} was already gone, refreshing", list.id);
            state.notify_error("List not found on the server. Refreshing...");
            state.loading += 1;
            vec![Effect::Delayed {
                delay: STALE_LIST_REFRESH_DELAY,
                effect: Box::new(Effect::LoadTaskLists { account }),
            }]
        }
        Err(e) => {
            tracing::warn!("Failed to delete task list {}: {}", list.id, e);
            state.notify_error("Failed to delete list. Please try again.");
            if state.account(&account.id).is_none() {
                return Vec::new();
            }

            let list_id = list.id.clone();
            let lists = state.task_lists.entry(account.id).or_default();
            let index = index.min(lists.len());
            lists.insert(index, list);
            if let Some(tasks) = tasks {
                state.tasks.insert(list_id.clone(), tasks);
            }
            if was_current {
                set_current_list(state, Some(list_id))
            } else {
                Vec::new()
            }
        }
    }
}

fn list_mut<'a>(
    state: &'a mut AppState,
    account_id: &str,
    list_id: &str,
) -> Option<&'a mut GoogleTaskList> {
    state
        .task_lists
        .get_mut(account_id)?
        .iter_mut()
        .find(|list| list.id == list_id)
}
