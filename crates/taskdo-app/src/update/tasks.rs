//! Task loading and the optimistic task operations.

use chrono::{NaiveDate, Utc};
use taskdo_auth::UserAccount;
use taskdo_core::AppError;
use taskdo_tasks::{GoogleTask, NewTask, TaskPatch, TasksError};

use super::accounts::begin_reauth;
use super::{load_tasks, sync_account};
use crate::intent::{Effect, Retry, UpdateKind};
use crate::state::AppState;

const NEW_TASK_TITLE: &str = "New task";

pub(super) fn tasks_loaded(
    state: &mut AppState,
    account: UserAccount,
    list_id: String,
    result: Result<Vec<GoogleTask>, TasksError>,
) -> Vec<Effect> {
    state.loading = state.loading.saturating_sub(1);
    state.loading_tasks.remove(&list_id);
    if state.account(&account.id).is_none() {
        return Vec::new();
    }
    sync_account(state, &account);

    let is_current = state.current_list_id.as_deref() == Some(list_id.as_str());
    match result {
        Ok(tasks) => {
            tracing::debug!(count = tasks.len(), "Loaded tasks for {}", list_id);
            if is_current {
                state.error = None;
            }
            state.tasks.insert(list_id, tasks);
        }
        Err(e) if e.requires_reauth() => {
            return begin_reauth(state, &account, Retry::Tasks { list_id });
        }
        Err(e) => {
            tracing::warn!("Failed to load tasks for {}: {}", list_id, e);
            if is_current {
                state.error = Some("Failed to load tasks".to_string());
            }
        }
    }
    Vec::new()
}

/// The selected list and the account that owns it.
fn current_target(state: &AppState) -> Option<(UserAccount, String)> {
    let list_id = state.current_list_id.clone()?;
    let account = state.account_for_list(&list_id)?.clone();
    Some((account, list_id))
}

fn task_index(state: &AppState, list_id: &str, task_id: &str) -> Option<usize> {
    state
        .tasks
        .get(list_id)?
        .iter()
        .position(|task| task.id == task_id)
}

fn task_mut<'a>(state: &'a mut AppState, list_id: &str, task_id: &str) -> Option<&'a mut GoogleTask> {
    state
        .tasks
        .get_mut(list_id)?
        .iter_mut()
        .find(|task| task.id == task_id)
}

pub(super) fn add_task(state: &mut AppState) -> Vec<Effect> {
    let Some((account, list_id)) = current_target(state) else {
        state.notify_error("Select a task list first");
        return Vec::new();
    };
    vec![Effect::CreateTask {
        account,
        list_id,
        task: NewTask::titled(NEW_TASK_TITLE),
    }]
}

pub(super) fn task_created(
    state: &mut AppState,
    account: UserAccount,
    list_id: String,
    result: Result<GoogleTask, TasksError>,
) -> Vec<Effect> {
    sync_account(state, &account);
    match result {
        Ok(task) => {
            if state.current_list_id.as_deref() == Some(list_id.as_str()) {
                state.editing_task_id = Some(task.id.clone());
                state.edit_error = None;
            }
            state.tasks.entry(list_id).or_default().insert(0, task);
        }
        Err(e) => {
            tracing::warn!("Failed to create task: {}", e);
            state.notify_error("Failed to create task. Please try again.");
        }
    }
    Vec::new()
}

pub(super) fn toggle_task(state: &mut AppState, task_id: &str, completed: bool) -> Vec<Effect> {
    let Some((account, list_id)) = current_target(state) else {
        return Vec::new();
    };
    let Some(task) = task_mut(state, &list_id, task_id) else {
        return Vec::new();
    };
    if task.is_completed() == completed {
        return Vec::new();
    }

    let previous = task.clone();
    let patch = if completed {
        TaskPatch::complete(Utc::now())
    } else {
        TaskPatch::reopen()
    };
    patch.apply_to(task);

    if completed {
        state.recently_completed.insert(task_id.to_string());
    } else {
        state.recently_completed.remove(task_id);
    }

    vec![Effect::UpdateTask {
        account,
        list_id,
        patch,
        previous,
        kind: UpdateKind::Toggle,
    }]
}

pub(super) fn edit_task(
    state: &mut AppState,
    task_id: &str,
    title: &str,
    notes: &str,
    due: Option<NaiveDate>,
) -> Vec<Effect> {
    if title.trim().is_empty() {
        state.edit_error = Some(AppError::Validation("Title is required".into()).user_message());
        return Vec::new();
    }
    let Some((account, list_id)) = current_target(state) else {
        return Vec::new();
    };
    let Some(task) = task_mut(state, &list_id, task_id) else {
        return Vec::new();
    };

    let previous = task.clone();
    let patch = TaskPatch::edit(title, notes, due);
    patch.apply_to(task);
    state.edit_error = None;

    vec![Effect::UpdateTask {
        account,
        list_id,
        patch,
        previous,
        kind: UpdateKind::Edit,
    }]
}

pub(super) fn task_updated(
    state: &mut AppState,
    account: UserAccount,
    list_id: String,
    previous: GoogleTask,
    kind: UpdateKind,
    result: Result<GoogleTask, TasksError>,
) -> Vec<Effect> {
    sync_account(state, &account);
    match result {
        Ok(updated) => {
            if kind == UpdateKind::Edit && state.editing_task_id.as_deref() == Some(updated.id.as_str())
            {
                state.editing_task_id = None;
                state.edit_error = None;
            }
            if let Some(task) = task_mut(state, &list_id, &updated.id) {
                *task = updated;
            }
        }
        Err(e) => {
            tracing::warn!("Failed to update task {}: {}", previous.id, e);
            match kind {
                UpdateKind::Toggle => {
                    if !previous.is_completed() {
                        state.recently_completed.remove(&previous.id);
                    }
                    state.notify_error("Failed to update task. Please try again.");
                }
                UpdateKind::Edit => {
                    state.edit_error = Some(AppError::from(e).user_message());
                    state.notify_error("Failed to save task. Please try again.");
                }
            }
            let previous_id = previous.id.clone();
            if let Some(task) = task_mut(state, &list_id, &previous_id) {
                *task = previous;
            }
        }
    }
    Vec::new()
}

pub(super) fn delete_task(state: &mut AppState, task_id: &str) -> Vec<Effect> {
    let Some((account, list_id)) = current_target(state) else {
        return Vec::new();
    };
    let Some(index) = task_index(state, &list_id, task_id) else {
        return Vec::new();
    };
    let Some(tasks) = state.tasks.get_mut(&list_id) else {
        return Vec::new();
    };

    let task = tasks.remove(index);
    state.recently_completed.remove(task_id);
    if state.editing_task_id.as_deref() == Some(task_id) {
        state.editing_task_id = None;
        state.edit_error = None;
    }

    vec![Effect::DeleteTask {
        account,
        list_id,
        task,
        index,
    }]
}

pub(super) fn task_deleted(
    state: &mut AppState,
    account: UserAccount,
    list_id: String,
    task: GoogleTask,
    index: usize,
    result: Result<(), TasksError>,
) -> Vec<Effect> {
    sync_account(state, &account);
    match result {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            tracing::debug!("Task {} was already deleted", task.id);
        }
        Err(e) => {
            tracing::warn!("Failed to delete task {}: {}", task.id, e);
            state.notify_error("Failed to delete task. Please try again.");
            if let Some(tasks) = state.tasks.get_mut(&list_id) {
                let index = index.min(tasks.len());
                tasks.insert(index, task);
            }
        }
    }
    Vec::new()
}

pub(super) fn move_to_top(state: &mut AppState, task_id: &str) -> Vec<Effect> {
    let Some((account, list_id)) = current_target(state) else {
        return Vec::new();
    };
    let Some(index) = task_index(state, &list_id, task_id) else {
        return Vec::new();
    };
    if index == 0 {
        return Vec::new();
    }
    if let Some(tasks) = state.tasks.get_mut(&list_id) {
        let task = tasks.remove(index);
        tasks.insert(0, task);
    }

    vec![Effect::MoveToTop {
        account,
        list_id,
        task_id: task_id.to_string(),
    }]
}

pub(super) fn task_moved(
    state: &mut AppState,
    account: UserAccount,
    list_id: String,
    task_id: &str,
    result: Result<GoogleTask, TasksError>,
) -> Vec<Effect> {
    sync_account(state, &account);
    match result {
        Ok(moved) => {
            if let Some(task) = task_mut(state, &list_id, task_id) {
                task.position = moved.position;
                task.parent = moved.parent;
            }
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Failed to move task {}: {}", task_id, e);
            state.notify_error("Failed to move task. Please try again.");
            load_tasks(state, &list_id)
        }
    }
}
