//! The reducer: `update(state, intent) -> effects`.
//!
//! Nothing in here performs I/O. Optimistic changes are applied immediately
//! and the effect carries whatever is needed to undo them when the result
//! intent reports a failure.

mod accounts;
mod lists;
mod tasks;

use taskdo_auth::UserAccount;

use crate::intent::{AuthPurpose, Effect, Intent};
use crate::settings::COMPLETED_PAGE;
use crate::state::AppState;

/// Apply `intent` to `state` and return the effects to run.
pub fn update(state: &mut AppState, intent: Intent) -> Vec<Effect> {
    tracing::debug!(intent = intent.kind(), "update");

    match intent {
        Intent::Init => vec![Effect::LoadStartup],
        Intent::StartupLoaded(startup) => accounts::startup_loaded(state, startup),
        Intent::AddAccount => vec![Effect::Authenticate(AuthPurpose::AddAccount)],
        Intent::RemoveAccount { account_id } => accounts::remove_account(state, &account_id),
        Intent::SelectScope(scope) => accounts::select_scope(state, scope),
        Intent::AuthCompleted { purpose, result } => accounts::auth_completed(state, purpose, result),

        Intent::SelectList { list_id } => lists::select_list(state, list_id),
        Intent::RefreshLists => load_scope_lists(state),
        Intent::RefreshTasks => {
            state.recently_completed.clear();
            current_list_tasks(state)
        }
        Intent::RefreshAll => {
            state.recently_completed.clear();
            let mut effects = load_scope_lists(state);
            effects.extend(current_list_tasks(state));
            effects
        }
        Intent::ListsLoaded { account, result } => lists::lists_loaded(state, account, result),
        Intent::TasksLoaded {
            account,
            list_id,
            result,
        } => tasks::tasks_loaded(state, account, list_id, result),

        Intent::AddTask => tasks::add_task(state),
        Intent::TaskCreated {
            account,
            list_id,
            result,
        } => tasks::task_created(state, account, list_id, result),
        Intent::ToggleTask { task_id, completed } => tasks::toggle_task(state, &task_id, completed),
        Intent::StartEditing { task_id } => {
            state.editing_task_id = Some(task_id);
            state.edit_error = None;
            Vec::new()
        }
        Intent::CancelEditing => {
            state.editing_task_id = None;
            state.edit_error = None;
            Vec::new()
        }
        Intent::EditTask {
            task_id,
            title,
            notes,
            due,
        } => tasks::edit_task(state, &task_id, &title, &notes, due),
        Intent::TaskUpdated {
            account,
            list_id,
            previous,
            kind,
            result,
        } => tasks::task_updated(state, account, list_id, previous, kind, result),
        Intent::DeleteTask { task_id } => tasks::delete_task(state, &task_id),
        Intent::TaskDeleted {
            account,
            list_id,
            task,
            index,
            result,
        } => tasks::task_deleted(state, account, list_id, task, index, result),
        Intent::MoveToTop { task_id } => tasks::move_to_top(state, &task_id),
        Intent::TaskMoved {
            account,
            list_id,
            task_id,
            result,
        } => tasks::task_moved(state, account, list_id, &task_id, result),

        Intent::CreateList { title } => lists::create_list(state, &title),
        Intent::ListCreated { account, result } => lists::list_created(state, account, result),
        Intent::RenameList { list_id, title } => lists::rename_list(state, &list_id, &title),
        Intent::ListRenamed {
            account,
            previous,
            result,
        } => lists::list_renamed(state, account, previous, result),
        Intent::DeleteList { list_id } => lists::delete_list(state, &list_id),
        Intent::ListDeleted {
            account,
            list,
            index,
            tasks,
            was_current,
            result,
        } => lists::list_deleted(state, account, list, index, tasks, was_current, result),

        Intent::SetSortMode(mode) => {
            if state.settings.sort_by == mode {
                return Vec::new();
            }
            state.settings.sort_by = mode;
            vec![Effect::PersistSettings(state.settings.clone())]
        }
        Intent::SetShowCompleted(show) => {
            if state.settings.show_completed_tasks == show {
                return Vec::new();
            }
            state.settings.show_completed_tasks = show;
            vec![Effect::PersistSettings(state.settings.clone())]
        }
        Intent::LoadMoreCompleted => {
            state.settings.completed_tasks_limit += COMPLETED_PAGE;
            vec![Effect::PersistSettings(state.settings.clone())]
        }
        Intent::SetLanguage(language) => {
            if state.language.as_deref() == Some(language.as_str()) {
                return Vec::new();
            }
            state.language = Some(language.clone());
            vec![Effect::PersistLanguage(language)]
        }
        Intent::DismissError => {
            state.error = None;
            Vec::new()
        }
    }
}

/// Copy tokens refreshed during an API call back into memory.
fn sync_account(state: &mut AppState, account: &UserAccount) {
    if state
        .reauth
        .as_ref()
        .is_some_and(|reauth| reauth.account_id == account.id)
    {
        return;
    }
    if let Some(existing) = state.accounts.iter_mut().find(|acc| acc.id == account.id) {
        existing.access_token.clone_from(&account.access_token);
        existing.refresh_token.clone_from(&account.refresh_token);
    }
}

/// Reload the lists of every account in scope.
fn load_scope_lists(state: &mut AppState) -> Vec<Effect> {
    let effects: Vec<Effect> = state
        .accounts_in_scope()
        .into_iter()
        .map(|account| Effect::LoadTaskLists {
            account: account.clone(),
        })
        .collect();
    state.loading += effects.len() as u32;
    effects
}

/// Load lists only for accounts in scope that have none yet.
fn load_missing_scope_lists(state: &mut AppState) -> Vec<Effect> {
    let effects: Vec<Effect> = state
        .accounts_in_scope()
        .into_iter()
        .filter(|account| !state.task_lists.contains_key(&account.id))
        .map(|account| Effect::LoadTaskLists {
            account: account.clone(),
        })
        .collect();
    state.loading += effects.len() as u32;
    effects
}

/// Fetch the tasks of `list_id` unless a fetch is already in flight.
fn load_tasks(state: &mut AppState, list_id: &str) -> Vec<Effect> {
    let Some(account) = state.account_for_list(list_id).cloned() else {
        return Vec::new();
    };
    if !state.loading_tasks.insert(list_id.to_string()) {
        return Vec::new();
    }
    state.loading += 1;
    vec![Effect::LoadTasks {
        account,
        list_id: list_id.to_string(),
    }]
}

fn current_list_tasks(state: &mut AppState) -> Vec<Effect> {
    match state.current_list_id.clone() {
        Some(list_id) => load_tasks(state, &list_id),
        None => Vec::new(),
    }
}

/// Switch the selected list, dropping per-list UI state.
fn set_current_list(state: &mut AppState, list_id: Option<String>) -> Vec<Effect> {
    if state.current_list_id == list_id {
        return Vec::new();
    }
    state.current_list_id = list_id.clone();
    state.recently_completed.clear();
    state.editing_task_id = None;
    state.edit_error = None;
    state.error = None;
    vec![Effect::PersistListSelection(list_id)]
}

/// Check the selected list against the lists now loaded.
///
/// A saved selection stays pending until every account in scope has its
/// lists; then an unknown selection falls back to the first visible list.
fn revalidate_selection(state: &mut AppState) -> Vec<Effect> {
    if !state.selections_loaded {
        return Vec::new();
    }
    if state.accounts_in_scope().is_empty() {
        return set_current_list(state, None);
    }
    if !state.scope_lists_loaded() {
        return Vec::new();
    }

    let visible: Vec<String> = state
        .visible_task_lists()
        .iter()
        .map(|list| list.id.clone())
        .collect();
    let still_visible = state
        .current_list_id
        .as_ref()
        .is_some_and(|id| visible.contains(id));

    let mut effects = Vec::new();
    if !still_visible {
        effects.extend(set_current_list(state, visible.into_iter().next()));
    }
    if let Some(list_id) = state.current_list_id.clone() {
        if !state.tasks.contains_key(&list_id) {
            effects.extend(load_tasks(state, &list_id));
        }
    }
    effects
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::fixtures::*;
    use super::*;
    use crate::settings::SortMode;

    #[test]
    fn test_init_loads_startup() {
        let mut state = AppState::default();
        assert_eq!(update(&mut state, Intent::Init), vec![Effect::LoadStartup]);
    }

    #[test]
    fn test_settings_changes_persist() {
        let mut state = loaded_state();

        let effects = update(&mut state, Intent::SetSortMode(SortMode::Title));
        assert_eq!(effects, vec![Effect::PersistSettings(state.settings.clone())]);
        assert_eq!(state.settings.sort_by, SortMode::Title);

        assert!(update(&mut state, Intent::SetSortMode(SortMode::Title)).is_empty());

        update(&mut state, Intent::SetShowCompleted(false));
        assert!(!state.settings.show_completed_tasks);

        update(&mut state, Intent::LoadMoreCompleted);
        assert_eq!(state.settings.completed_tasks_limit, 20);
    }

    #[test]
    fn test_language_persists_once() {
        let mut state = loaded_state();
        assert_eq!(
            update(&mut state, Intent::SetLanguage("de".into())),
            vec![Effect::PersistLanguage("de".into())]
        );
        assert!(update(&mut state, Intent::SetLanguage("de".into())).is_empty());
    }

    #[test]
    fn test_refresh_tasks_clears_recently_completed() {
        let mut state = loaded_state();
        state.recently_completed.insert("t1".into());

        let effects = update(&mut state, Intent::RefreshTasks);

        assert!(state.recently_completed.is_empty());
        assert_eq!(
            effects,
            vec![Effect::LoadTasks {
                account: account("ada@x.com"),
                list_id: "L1".into()
            }]
        );
        assert_eq!(state.loading, 1);

        // Already in flight.
        assert!(update(&mut state, Intent::RefreshTasks).is_empty());
    }

    #[test]
    fn test_refresh_all_reloads_lists_and_tasks() {
        let mut state = loaded_state();
        let effects = update(&mut state, Intent::RefreshAll);
        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], Effect::LoadTaskLists { .. }));
        assert!(matches!(effects[1], Effect::LoadTasks { .. }));
        assert_eq!(state.loading, 2);
    }

    #[test]
    fn test_editing_state() {
        let mut state = loaded_state();
        update(&mut state, Intent::StartEditing { task_id: "t2".into() });
        assert_eq!(state.editing_task_id.as_deref(), Some("t2"));
        update(&mut state, Intent::CancelEditing);
        assert!(state.editing_task_id.is_none());
    }

    #[test]
    fn test_dismiss_error() {
        let mut state = loaded_state();
        state.error = Some("Failed to load tasks".into());
        update(&mut state, Intent::DismissError);
        assert!(state.error.is_none());
    }
}
