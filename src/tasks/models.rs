use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TaskId = i64;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} code: {code}")]
pub struct UnknownCode {
    kind: &'static str,
    code: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskStatus {
    Completed = 1,
    Incomplete = 2,
    Cancelled = 3,
}

impl TryFrom<u8> for TaskStatus {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Completed),
            2 => Ok(Self::Incomplete),
            3 => Ok(Self::Cancelled),
            code => Err(UnknownCode { kind: "task status", code }),
        }
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> u8 {
        status as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoticeStatus {
    Notified = 1,
    NotNotified = 2,
}

impl TryFrom<u8> for NoticeStatus {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Notified),
            2 => Ok(Self::NotNotified),
            code => Err(UnknownCode { kind: "notice status", code }),
        }
    }
}

impl From<NoticeStatus> for u8 {
    fn from(status: NoticeStatus) -> u8 {
        status as u8
    }
}

/// One task as the backend returns it. Fields this layer does not interpret
/// (customer name, phone, address, ...) are carried in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "isnotice", default, skip_serializing_if = "Option::is_none")]
    pub notice_status: Option<NoticeStatus>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            status: None,
            notice_status: None,
            remark: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// List cursor for incremental loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_tasks: u64,
    pub no_more_data: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_tasks: 0,
            no_more_data: false,
        }
    }
}
