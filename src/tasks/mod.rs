pub mod models;

use serde::{Deserialize, Serialize};

use crate::storage::persisted::{Persisted, PersistedStore};
pub use models::{NoticeStatus, Pagination, Task, TaskId, TaskStatus};

pub type TaskStore = PersistedStore<TaskState>;

/// Task list, pagination cursor and the task opened in the detail view.
///
/// Only `current_task` survives a restart; the list is rebuilt from the
/// backend each time the app starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskState {
    pub current_task: Option<Task>,
    pub task_list: Vec<Task>,
    pub pagination: Pagination,
    /// `YYYY-MM-DD` the list is showing.
    pub selected_date: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    #[serde(default)]
    pub current_task: Option<Task>,
}

impl TaskState {
    pub fn set_current_task(&mut self, task: Task) {
        self.current_task = Some(task);
    }

    pub fn clear_current_task(&mut self) {
        self.current_task = None;
    }

    pub fn set_task_list(&mut self, list: Vec<Task>) {
        self.task_list = list;
    }

    pub fn add_tasks_to_list(&mut self, tasks: impl IntoIterator<Item = Task>) {
        self.task_list.extend(tasks);
    }

    pub fn set_total_tasks(&mut self, total: u64) {
        self.pagination.total_tasks = total;
    }

    pub fn set_current_page(&mut self, page: u32) {
        self.pagination.current_page = page;
    }

    pub fn set_no_more_data(&mut self, no_more_data: bool) {
        self.pagination.no_more_data = no_more_data;
    }

    pub fn set_selected_date(&mut self, date: impl Into<String>) {
        self.selected_date = date.into();
    }

    pub fn reset_pagination(&mut self) {
        self.pagination = Pagination::default();
        self.task_list.clear();
    }

    /// Returns false when the id is not in the list; nothing is changed then.
    pub fn update_task_status(&mut self, id: TaskId, status: TaskStatus) -> bool {
        self.update_task(id, |task| task.status = Some(status))
    }

    pub fn update_task_notice_status(&mut self, id: TaskId, status: NoticeStatus) -> bool {
        self.update_task(id, |task| task.notice_status = Some(status))
    }

    pub fn update_task_remark(&mut self, id: TaskId, remark: &str) -> bool {
        self.update_task(id, |task| task.remark = Some(remark.to_string()))
    }

    // The current task is only touched when the list holds the same id, so
    // the two copies never drift apart.
    fn update_task(&mut self, id: TaskId, apply: impl Fn(&mut Task)) -> bool {
        let Some(listed) = self.task_list.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        apply(listed);

        if let Some(current) = self.current_task.as_mut().filter(|t| t.id == id) {
            apply(current);
        }
        true
    }
}

impl Persisted for TaskState {
    const STORAGE_KEY: &'static str = "task";
    type Snapshot = TaskSnapshot;

    fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            current_task: self.current_task.clone(),
        }
    }

    fn restore(&mut self, snapshot: TaskSnapshot) {
        self.current_task = snapshot.current_task;
    }
}
