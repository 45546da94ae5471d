//! Headless taskdo application core.
//!
//! User actions enter as [`Intent`]s, [`update`] applies them to the
//! [`AppState`] and returns [`Effect`]s, and the [`EffectRunner`] turns those
//! into network and storage calls whose results come back as intents.
//! [`TaskApp`] drives the loop.

pub mod app;
pub mod intent;
pub mod runner;
pub mod settings;
pub mod state;
pub mod update;
pub mod view;

pub use app::TaskApp;
pub use intent::{AuthPurpose, Effect, Intent, Retry, Startup, UpdateKind};
pub use runner::EffectRunner;
pub use settings::{ExtensionSettings, SortMode, COMPLETED_PAGE};
pub use state::{AccountScope, AppState, Notification, NotificationKind, Reauth};
pub use update::update;
pub use view::{group_by_date, sort_tasks, DateBucket, DateGroup, TaskView};
