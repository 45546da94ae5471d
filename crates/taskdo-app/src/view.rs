//! Pure presentation helpers: sorting, date buckets and the completed section.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use taskdo_tasks::{GoogleTask, GoogleTaskList};

use crate::settings::{ExtensionSettings, SortMode};

/// Stable sort of `tasks` by `mode`.
///
/// `Date` puts undated tasks after every dated one; `Title` ignores case and
/// puts lowercase first among titles differing only in case.
pub fn sort_tasks(mut tasks: Vec<&GoogleTask>, mode: SortMode) -> Vec<&GoogleTask> {
    match mode {
        SortMode::MyOrder => {}
        SortMode::Date => tasks.sort_by(|a, b| match (a.due, b.due) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortMode::Title => tasks.sort_by_cached_key(|task| title_key(&task.title)),
    }
    tasks
}

fn title_key(title: &str) -> (String, String) {
    let swapped: String = title
        .chars()
        .map(|c| {
            if c.is_lowercase() {
                c.to_uppercase().collect::<String>()
            } else {
                c.to_lowercase().collect()
            }
        })
        .collect();
    (title.to_lowercase(), swapped)
}

/// Date group of a task. The derived order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateBucket {
    Overdue,
    Today,
    Tomorrow,
    On(NaiveDate),
    NoDate,
}

impl DateBucket {
    pub fn for_due(due: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(due) = due else {
            return Self::NoDate;
        };
        match due.signed_duration_since(today).num_days() {
            d if d < 0 => Self::Overdue,
            0 => Self::Today,
            1 => Self::Tomorrow,
            _ => Self::On(due),
        }
    }

    /// `dd.MM`, with the year appended for dates past the current year.
    pub fn label(&self, today: NaiveDate) -> String {
        match self {
            Self::Overdue => "Overdue".to_string(),
            Self::Today => "Today".to_string(),
            Self::Tomorrow => "Tomorrow".to_string(),
            Self::NoDate => "No date".to_string(),
            Self::On(date) if date.year() > today.year() => date.format("%d.%m.%Y").to_string(),
            Self::On(date) => date.format("%d.%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateGroup<'a> {
    pub bucket: DateBucket,
    pub label: String,
    pub tasks: Vec<&'a GoogleTask>,
}

/// Group already-sorted tasks into date buckets, keeping their order inside a bucket.
pub fn group_by_date<'a>(tasks: &[&'a GoogleTask], today: NaiveDate) -> Vec<DateGroup<'a>> {
    let mut buckets: BTreeMap<DateBucket, Vec<&'a GoogleTask>> = BTreeMap::new();
    for &task in tasks {
        buckets
            .entry(DateBucket::for_due(task.due_date(), today))
            .or_default()
            .push(task);
    }

    buckets
        .into_iter()
        .map(|(bucket, tasks)| DateGroup {
            label: bucket.label(today),
            bucket,
            tasks,
        })
        .collect()
}

/// Everything needed to render the current list.
#[derive(Debug, Clone, Default)]
pub struct TaskView<'a> {
    pub list: Option<&'a GoogleTaskList>,
    /// Incomplete tasks plus recently completed ones, sorted.
    pub active: Vec<&'a GoogleTask>,
    /// Date buckets of `active`, only in date mode.
    pub groups: Vec<DateGroup<'a>>,
    pub show_completed: bool,
    /// Completed tasks newest first, cut to the display limit.
    pub completed: Vec<&'a GoogleTask>,
    pub completed_total: usize,
    pub has_more_completed: bool,
}

impl<'a> TaskView<'a> {
    pub fn build(
        list: Option<&'a GoogleTaskList>,
        tasks: &'a [GoogleTask],
        recently_completed: &HashSet<String>,
        settings: &ExtensionSettings,
        today: NaiveDate,
    ) -> Self {
        let (active, mut completed): (Vec<&GoogleTask>, Vec<&GoogleTask>) = tasks
            .iter()
            .partition(|task| !task.is_completed() || recently_completed.contains(&task.id));

        let active = sort_tasks(active, settings.sort_by);
        let groups = if settings.sort_by == SortMode::Date {
            group_by_date(&active, today)
        } else {
            Vec::new()
        };

        completed.sort_by(|a, b| match (a.completed, b.completed) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        let completed_total = completed.len();
        completed.truncate(settings.completed_tasks_limit);

        Self {
            list,
            active,
            groups,
            show_completed: settings.show_completed_tasks,
            completed,
            completed_total,
            has_more_completed: completed_total > settings.completed_tasks_limit,
        }
    }
}
