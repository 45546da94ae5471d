use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use taskdo_app::{Intent, NotificationKind, TaskApp};
use taskdo_auth::LoopbackIdentityFlow;
use taskdo_core::{Config, SqliteSyncStore, SyncStore};

#[tokio::main]
async fn main() -> Result<()> {
    taskdo_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::info!("Using config directory {}", config.config_dir.display());

    let store: Arc<dyn SyncStore> = Arc::new(SqliteSyncStore::open(config.storage_path())?);
    let identity = LoopbackIdentityFlow::new(
        config.google.redirect_port,
        Duration::from_secs(config.google.auth_timeout_secs),
    );
    let mut app = TaskApp::from_config(&config, store, identity);

    app.dispatch(Intent::Init).await;
    if app.state().accounts.is_empty() {
        println!("No accounts connected. Opening the browser to sign in...");
        app.dispatch(Intent::AddAccount).await;
    }

    for notification in app.take_notifications() {
        match notification.kind {
            NotificationKind::Success => println!("{}", notification.message),
            NotificationKind::Error => eprintln!("{}", notification.message),
        }
    }

    print_summary(&app);
    Ok(())
}

fn print_summary(app: &TaskApp<LoopbackIdentityFlow>) {
    let state = app.state();
    for account in &state.accounts {
        println!("{} <{}>", account.name, account.email);
    }

    let view = app.view(chrono::Local::now().date_naive());
    match view.list {
        Some(list) => println!("\n{}", list.title),
        None => println!("\nNo task list selected"),
    }

    if view.groups.is_empty() {
        for task in &view.active {
            println!("  [ ] {}", task.title);
        }
    } else {
        for group in &view.groups {
            println!("  {}", group.label);
            for task in &group.tasks {
                println!("    [ ] {}", task.title);
            }
        }
    }

    if view.show_completed && view.completed_total > 0 {
        println!("  Completed ({})", view.completed_total);
        for task in &view.completed {
            println!("    [x] {}", task.title);
        }
    }

    if let Some(error) = &state.error {
        eprintln!("\n{}", error);
    }
}
