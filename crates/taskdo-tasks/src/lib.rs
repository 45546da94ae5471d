//! Google Tasks API integration for taskdo.

pub mod client;
pub mod error;
pub mod executor;
pub mod retry;
pub mod types;

pub use client::TasksClient;
pub use error::TasksError;
pub use executor::{with_token_refresh, AccountSession};
pub use retry::RetryConfig;
pub use types::{
    due_from_date, format_instant, GoogleTask, GoogleTaskList, NewTask, TaskLink, TaskPatch,
    TaskStatus,
};
