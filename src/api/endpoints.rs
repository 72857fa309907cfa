//! Typed calls for each backend endpoint. All of them POST a JSON object and
//! hand back the raw response.

use serde::Serialize;

use super::error::ApiResult;
use super::{ApiClient, RawResponse, RequestOptions};
use crate::tasks::{NoticeStatus, TaskId, TaskStatus};

pub const DEFAULT_PAGE: u32 = 1;

pub const TASKS_PATH: &str = "/tasks";
pub const SEARCH_TASKS_PATH: &str = "/search-tasks";
pub const UPDATE_REMARK_PATH: &str = "/update-remark";
pub const UPDATE_NOTICE_STATUS_PATH: &str = "/update-notice-status";
pub const UPDATE_TASK_STATUS_PATH: &str = "/update-task-status";
pub const TASK_DETAIL_PATH: &str = "/task-detail";
pub const CHANGE_PASSWORD_PATH: &str = "/change-password";
pub const ALL_TASKS_PATH: &str = "/all-tasks";

#[derive(Debug, Serialize)]
struct DatedPage<'a> {
    userid: &'a str,
    date: &'a str,
    page: u32,
}

/// Search by customer name or phone; the backend expects one of the two.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchTasksParams {
    pub userid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RemarkUpdate<'a> {
    id: TaskId,
    remark: &'a str,
    userid: &'a str,
}

#[derive(Debug, Serialize)]
struct NoticeUpdate<'a> {
    id: TaskId,
    isnotice: NoticeStatus,
    userid: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    id: TaskId,
    status: TaskStatus,
    userid: &'a str,
}

#[derive(Debug, Serialize)]
struct TaskRef<'a> {
    id: TaskId,
    userid: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange<'a> {
    userid: &'a str,
    old_password: &'a str,
    new_password: &'a str,
}

impl ApiClient {
    async fn post<T: Serialize>(&self, path: &str, payload: &T) -> ApiResult<RawResponse> {
        self.request(RequestOptions::post(path).json(payload)?).await
    }

    /// Tasks scheduled for `date` (`YYYY-MM-DD`).
    pub async fn fetch_tasks(&self, date: &str, userid: &str, page: u32) -> ApiResult<RawResponse> {
        self.post(TASKS_PATH, &DatedPage { userid, date, page }).await
    }

    pub async fn search_tasks(&self, params: &SearchTasksParams) -> ApiResult<RawResponse> {
        self.post(SEARCH_TASKS_PATH, params).await
    }

    pub async fn update_task_remark(
        &self,
        id: TaskId,
        remark: &str,
        userid: &str,
    ) -> ApiResult<RawResponse> {
        self.post(UPDATE_REMARK_PATH, &RemarkUpdate { id, remark, userid })
            .await
    }

    pub async fn update_notice_status(
        &self,
        id: TaskId,
        isnotice: NoticeStatus,
        userid: &str,
    ) -> ApiResult<RawResponse> {
        self.post(UPDATE_NOTICE_STATUS_PATH, &NoticeUpdate { id, isnotice, userid })
            .await
    }

    pub async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        userid: &str,
    ) -> ApiResult<RawResponse> {
        self.post(UPDATE_TASK_STATUS_PATH, &StatusUpdate { id, status, userid })
            .await
    }

    pub async fn get_task_detail(&self, id: TaskId, userid: &str) -> ApiResult<RawResponse> {
        self.post(TASK_DETAIL_PATH, &TaskRef { id, userid }).await
    }

    pub async fn change_password(
        &self,
        userid: &str,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<RawResponse> {
        self.post(
            CHANGE_PASSWORD_PATH,
            &PasswordChange {
                userid,
                old_password,
                new_password,
            },
        )
        .await
    }

    /// Every task of the user on `date`, used by the performance screen.
    pub async fn get_performance_data(
        &self,
        userid: &str,
        date: &str,
        page: u32,
    ) -> ApiResult<RawResponse> {
        self.post(ALL_TASKS_PATH, &DatedPage { userid, date, page }).await
    }
}
