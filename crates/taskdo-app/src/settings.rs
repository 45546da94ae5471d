use serde::{Deserialize, Serialize};

/// How the active section is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    /// Server order.
    #[default]
    MyOrder,
    Date,
    Title,
}

/// User preferences persisted under the `settings` key.
///
/// Missing fields take their defaults, so older stored values keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionSettings {
    pub show_completed_tasks: bool,
    pub completed_tasks_limit: usize,
    pub sort_by: SortMode,
}

/// Completed tasks revealed per "load more".
pub const COMPLETED_PAGE: usize = 10;

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            show_completed_tasks: true,
            completed_tasks_limit: COMPLETED_PAGE,
            sort_by: SortMode::MyOrder,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_partial_settings_merge_with_defaults() {
        let settings: ExtensionSettings =
            serde_json::from_value(serde_json::json!({ "sortBy": "date" })).unwrap();

        assert_eq!(settings.sort_by, SortMode::Date);
        assert!(settings.show_completed_tasks);
        assert_eq!(settings.completed_tasks_limit, 10);
    }

    #[test]
    fn test_settings_shape() {
        let json = serde_json::to_value(ExtensionSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "showCompletedTasks": true,
                "completedTasksLimit": 10,
                "sortBy": "myOrder"
            })
        );
    }
}
