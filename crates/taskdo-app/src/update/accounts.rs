//! Startup, account selection, sign-in and re-authentication.

use taskdo_auth::{AuthError, UserAccount};
use taskdo_core::AppError;

use super::{load_missing_scope_lists, load_tasks, revalidate_selection};
use crate::intent::{AuthPurpose, Effect, Retry, Startup};
use crate::state::{AccountScope, AppState, Reauth};

pub(super) fn startup_loaded(state: &mut AppState, startup: Startup) -> Vec<Effect> {
    tracing::info!(
        accounts = startup.accounts.len(),
        "Loaded persisted state"
    );
    state.accounts = startup.accounts;
    state.settings = startup.settings;
    state.language = startup.language;
    state.startup_loaded = true;

    let saved = startup.saved_account_id.as_deref().map(AccountScope::from_saved);
    let scope = match saved.clone() {
        Some(AccountScope::All) if !state.accounts.is_empty() => Some(AccountScope::All),
        Some(AccountScope::Account(id)) if state.account(&id).is_some() => {
            Some(AccountScope::Account(id))
        }
        _ => default_scope(&state.accounts),
    };

    let mut effects = Vec::new();
    if scope != saved {
        if let Some(scope) = &scope {
            effects.push(Effect::PersistScope(scope.clone()));
        }
    }
    state.scope = scope;
    // Kept until the lists arrive and it can be checked.
    state.current_list_id = startup.saved_list_id;
    state.selections_loaded = true;

    effects.extend(load_missing_scope_lists(state));
    effects.extend(revalidate_selection(state));
    effects
}

/// ALL for several accounts, the only account for one.
fn default_scope(accounts: &[UserAccount]) -> Option<AccountScope> {
    match accounts {
        [] => None,
        [only] => Some(AccountScope::Account(only.id.clone())),
        _ => Some(AccountScope::All),
    }
}

pub(super) fn select_scope(state: &mut AppState, scope: AccountScope) -> Vec<Effect> {
    let valid = match &scope {
        AccountScope::All => !state.accounts.is_empty(),
        AccountScope::Account(id) => state.account(id).is_some(),
    };
    if !valid {
        tracing::warn!("Ignoring selection of unknown account");
        return Vec::new();
    }
    if state.scope.as_ref() == Some(&scope) {
        return Vec::new();
    }

    state.scope = Some(scope.clone());
    state.editing_task_id = None;
    state.edit_error = None;

    let mut effects = vec![Effect::PersistScope(scope)];
    effects.extend(load_missing_scope_lists(state));
    effects.extend(revalidate_selection(state));
    effects
}

pub(super) fn remove_account(state: &mut AppState, account_id: &str) -> Vec<Effect> {
    let Some(removed) = drop_account(state, account_id) else {
        return Vec::new();
    };
    tracing::info!(account = %removed.email, "Removing account");

    let mut effects = vec![Effect::ForgetAccount {
        account_id: account_id.to_string(),
    }];
    effects.extend(fix_scope(state, account_id));
    state.notify_success(format!("Removed {}", removed.email));
    effects.extend(load_missing_scope_lists(state));
    effects.extend(revalidate_selection(state));
    effects
}

/// Remove an account with its lists and tasks from memory.
fn drop_account(state: &mut AppState, account_id: &str) -> Option<UserAccount> {
    let index = state.accounts.iter().position(|acc| acc.id == account_id)?;
    let removed = state.accounts.remove(index);
    drop_account_data(state, account_id);
    Some(removed)
}

fn drop_account_data(state: &mut AppState, account_id: &str) {
    for list in state.task_lists.remove(account_id).unwrap_or_default() {
        state.tasks.remove(&list.id);
        state.loading_tasks.remove(&list.id);
    }
}

/// Move the scope off a removed account.
fn fix_scope(state: &mut AppState, removed_id: &str) -> Vec<Effect> {
    let next = match &state.scope {
        Some(AccountScope::Account(id)) if id == removed_id => state
            .accounts
            .first()
            .map(|acc| AccountScope::Account(acc.id.clone())),
        Some(AccountScope::All) if state.accounts.is_empty() => None,
        _ => return Vec::new(),
    };
    state.scope = next.clone();
    next.map(Effect::PersistScope).into_iter().collect()
}

/// Start signing an account in again after its token could not be refreshed.
pub(super) fn begin_reauth(state: &mut AppState, account: &UserAccount, retry: Retry) -> Vec<Effect> {
    if let Some(active) = &state.reauth {
        if active.account_id == account.id {
            return Vec::new();
        }
        state.notify_error(format!(
            "Authentication expired for {}. Please try again later.",
            account.email
        ));
        // Counts as a failed load so the other accounts' selection can settle.
        if retry == Retry::TaskLists {
            state.task_lists.entry(account.id.clone()).or_default();
            return revalidate_selection(state);
        }
        return Vec::new();
    }

    tracing::info!(account = %account.email, "Authentication expired, re-authenticating");
    state.reauth = Some(Reauth {
        account_id: account.id.clone(),
        email: account.email.clone(),
        retry,
    });
    state.notify_error("Authentication expired. Re-authenticating...");
    vec![Effect::Authenticate(AuthPurpose::Reauthenticate {
        account_id: account.id.clone(),
    })]
}

pub(super) fn auth_completed(
    state: &mut AppState,
    purpose: AuthPurpose,
    result: Result<UserAccount, AuthError>,
) -> Vec<Effect> {
    match purpose {
        AuthPurpose::AddAccount => account_added(state, result),
        AuthPurpose::Reauthenticate { account_id } => reauthenticated(state, &account_id, result),
    }
}

fn account_added(state: &mut AppState, result: Result<UserAccount, AuthError>) -> Vec<Effect> {
    let account = match result {
        Ok(account) => account,
        Err(e) if e.is_cancelled() => {
            tracing::info!("Sign-in cancelled");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Failed to add account: {}", e);
            state.notify_error(AppError::from(e).user_message());
            return Vec::new();
        }
    };

    if let Some(existing) = state.accounts.iter_mut().find(|acc| acc.email == account.email) {
        existing.access_token = account.access_token;
        if account.refresh_token.is_some() {
            existing.refresh_token = account.refresh_token;
        }
        let message = format!("{} is already connected", account.email);
        state.notify_error(message);
        return vec![Effect::PersistAccounts(state.accounts.clone())];
    }

    tracing::info!(account = %account.email, "Account added");
    state.notify_success(format!("Added {}", account.name));
    let scope = AccountScope::Account(account.id.clone());
    state.accounts.push(account.clone());
    state.scope = Some(scope.clone());
    state.current_list_id = None;
    state.selections_loaded = true;
    state.loading += 1;

    vec![
        Effect::PersistAccounts(state.accounts.clone()),
        Effect::PersistScope(scope),
        Effect::LoadTaskLists { account },
    ]
}

fn reauthenticated(
    state: &mut AppState,
    account_id: &str,
    result: Result<UserAccount, AuthError>,
) -> Vec<Effect> {
    let reauth = match state.reauth.take() {
        Some(reauth) if reauth.account_id == account_id => reauth,
        other => {
            state.reauth = other;
            tracing::warn!("Ignoring stale re-authentication result");
            return Vec::new();
        }
    };

    match result {
        Ok(account) if account.id == reauth.account_id => {
            tracing::info!(account = %account.email, "Re-authenticated");
            if let Some(existing) = state.accounts.iter_mut().find(|acc| acc.id == account.id) {
                *existing = account.clone();
            }
            state.notify_success("Successfully re-authenticated!");

            let mut effects = vec![Effect::PersistAccounts(state.accounts.clone())];
            match reauth.retry {
                Retry::TaskLists => {
                    state.loading += 1;
                    effects.push(Effect::LoadTaskLists { account });
                }
                Retry::Tasks { list_id } => effects.extend(load_tasks(state, &list_id)),
            }
            effects
        }
        Ok(account) => {
            tracing::info!(
                old = %reauth.email,
                new = %account.email,
                "Re-authenticated as a different account"
            );
            let index = state.accounts.iter().position(|acc| acc.id == reauth.account_id);
            drop_account_data(state, &reauth.account_id);
            state.accounts.retain(|acc| acc.id != reauth.account_id);
            state.accounts.retain(|acc| acc.id != account.id);
            drop_account_data(state, &account.id);
            let index = index.unwrap_or(state.accounts.len()).min(state.accounts.len());
            state.accounts.insert(index, account.clone());

            let mut effects = vec![Effect::PersistAccounts(state.accounts.clone())];
            if state.scope.as_ref() == Some(&AccountScope::Account(reauth.account_id.clone())) {
                let scope = AccountScope::Account(account.id.clone());
                state.scope = Some(scope.clone());
                effects.push(Effect::PersistScope(scope));
            }
            state.notify_success(format!("Re-authenticated as {}", account.name));
            effects.extend(load_missing_scope_lists(state));
            effects.extend(revalidate_selection(state));
            effects
        }
        Err(e) => {
            tracing::warn!(account = %reauth.email, "Re-authentication failed: {}", e);
            drop_account(state, &reauth.account_id);

            let mut effects = vec![Effect::PersistAccounts(state.accounts.clone())];
            effects.extend(fix_scope(state, &reauth.account_id));
            if e.is_cancelled() {
                state.notify_error("Re-authentication was cancelled");
            } else {
                state.notify_error("Failed to re-authenticate. Please try again.");
            }
            effects.extend(load_missing_scope_lists(state));
            effects.extend(revalidate_selection(state));
            effects
        }
    }
}
