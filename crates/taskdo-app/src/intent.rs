//! Everything that can happen to the app, and everything it can ask for.
//!
//! User actions and completed effects both arrive as [`Intent`]s; the reducer
//! answers with [`Effect`]s that the runner executes outside the state path.

use std::time::Duration;

use chrono::NaiveDate;
use taskdo_auth::{AuthError, UserAccount};
use taskdo_tasks::{GoogleTask, GoogleTaskList, NewTask, TaskPatch, TasksError};

use crate::settings::{ExtensionSettings, SortMode};
use crate::state::AccountScope;

/// Why the interactive sign-in was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPurpose {
    AddAccount,
    /// The account is forgotten from storage before the flow runs.
    Reauthenticate { account_id: String },
}

/// The load that triggered a re-authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retry {
    TaskLists,
    Tasks { list_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Toggle,
    Edit,
}

/// Persisted state read at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Startup {
    pub accounts: Vec<UserAccount>,
    pub settings: ExtensionSettings,
    pub saved_account_id: Option<String>,
    pub saved_list_id: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug)]
pub enum Intent {
    // User actions
    Init,
    AddAccount,
    RemoveAccount { account_id: String },
    SelectScope(AccountScope),
    SelectList { list_id: String },
    RefreshLists,
    RefreshTasks,
    RefreshAll,
    AddTask,
    ToggleTask { task_id: String, completed: bool },
    StartEditing { task_id: String },
    CancelEditing,
    EditTask {
        task_id: String,
        title: String,
        notes: String,
        due: Option<NaiveDate>,
    },
    DeleteTask { task_id: String },
    MoveToTop { task_id: String },
    CreateList { title: String },
    RenameList { list_id: String, title: String },
    DeleteList { list_id: String },
    SetSortMode(SortMode),
    SetShowCompleted(bool),
    LoadMoreCompleted,
    SetLanguage(String),
    DismissError,

    // Effect results
    StartupLoaded(Startup),
    AuthCompleted {
        purpose: AuthPurpose,
        result: Result<UserAccount, AuthError>,
    },
    ListsLoaded {
        account: UserAccount,
        result: Result<Vec<GoogleTaskList>, TasksError>,
    },
    TasksLoaded {
        account: UserAccount,
        list_id: String,
        result: Result<Vec<GoogleTask>, TasksError>,
    },
    TaskCreated {
        account: UserAccount,
        list_id: String,
        result: Result<GoogleTask, TasksError>,
    },
    TaskUpdated {
        account: UserAccount,
        list_id: String,
        previous: GoogleTask,
        kind: UpdateKind,
        result: Result<GoogleTask, TasksError>,
    },
    TaskDeleted {
        account: UserAccount,
        list_id: String,
        task: GoogleTask,
        index: usize,
        result: Result<(), TasksError>,
    },
    TaskMoved {
        account: UserAccount,
        list_id: String,
        task_id: String,
        result: Result<GoogleTask, TasksError>,
    },
    ListCreated {
        account: UserAccount,
        result: Result<GoogleTaskList, TasksError>,
    },
    ListRenamed {
        account: UserAccount,
        previous: GoogleTaskList,
        result: Result<GoogleTaskList, TasksError>,
    },
    ListDeleted {
        account: UserAccount,
        list: GoogleTaskList,
        index: usize,
        tasks: Option<Vec<GoogleTask>>,
        was_current: bool,
        result: Result<(), TasksError>,
    },
}

impl Intent {
    /// Short name for logs. Payloads may hold tokens.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::AddAccount => "AddAccount",
            Self::RemoveAccount { .. } => "RemoveAccount",
            Self::SelectScope(_) => "SelectScope",
            Self::SelectList { .. } => "SelectList",
            Self::RefreshLists => "RefreshLists",
            Self::RefreshTasks => "RefreshTasks",
            Self::RefreshAll => "RefreshAll",
            Self::AddTask => "AddTask",
            Self::ToggleTask { .. } => "ToggleTask",
            Self::StartEditing { .. } => "StartEditing",
            Self::CancelEditing => "CancelEditing",
            Self::EditTask { .. } => "EditTask",
            Self::DeleteTask { .. } => "DeleteTask",
            Self::MoveToTop { .. } => "MoveToTop",
            Self::CreateList { .. } => "CreateList",
            Self::RenameList { .. } => "RenameList",
            Self::DeleteList { .. } => "DeleteList",
            Self::SetSortMode(_) => "SetSortMode",
            Self::SetShowCompleted(_) => "SetShowCompleted",
            Self::LoadMoreCompleted => "LoadMoreCompleted",
            Self::SetLanguage(_) => "SetLanguage",
            Self::DismissError => "DismissError",
            Self::StartupLoaded(_) => "StartupLoaded",
            Self::AuthCompleted { .. } => "AuthCompleted",
            Self::ListsLoaded { .. } => "ListsLoaded",
            Self::TasksLoaded { .. } => "TasksLoaded",
            Self::TaskCreated { .. } => "TaskCreated",
            Self::TaskUpdated { .. } => "TaskUpdated",
            Self::TaskDeleted { .. } => "TaskDeleted",
            Self::TaskMoved { .. } => "TaskMoved",
            Self::ListCreated { .. } => "ListCreated",
            Self::ListRenamed { .. } => "ListRenamed",
            Self::ListDeleted { .. } => "ListDeleted",
        }
    }
}

/// Side effects requested by the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadStartup,
    Authenticate(AuthPurpose),
    /// Delete the account from persisted storage.
    ForgetAccount { account_id: String },
    PersistAccounts(Vec<UserAccount>),
    PersistSettings(ExtensionSettings),
    PersistScope(AccountScope),
    /// `None` clears the saved list.
    PersistListSelection(Option<String>),
    PersistLanguage(String),
    LoadTaskLists { account: UserAccount },
    LoadTasks { account: UserAccount, list_id: String },
    CreateTask {
        account: UserAccount,
        list_id: String,
        task: NewTask,
    },
    UpdateTask {
        account: UserAccount,
        list_id: String,
        patch: TaskPatch,
        previous: GoogleTask,
        kind: UpdateKind,
    },
    DeleteTask {
        account: UserAccount,
        list_id: String,
        task: GoogleTask,
        index: usize,
    },
    MoveToTop {
        account: UserAccount,
        list_id: String,
        task_id: String,
    },
    CreateList { account: UserAccount, title: String },
    RenameList {
        account: UserAccount,
        previous: GoogleTaskList,
        title: String,
    },
    DeleteList {
        account: UserAccount,
        list: GoogleTaskList,
        index: usize,
        tasks: Option<Vec<GoogleTask>>,
        was_current: bool,
    },
    /// Run `effect` after `delay`.
    Delayed { delay: Duration, effect: Box<Effect> },
}
