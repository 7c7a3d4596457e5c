//! 任务创建客户端
//!
//! 校验标题、计算截止时间与描述，向任务后端发起一次创建请求（不重试），
//! 并把后端结果统一为 TaskCreationResult。任何错误都不会向调用方抛出。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::core::{ApiStatus, LarkError};

pub const EMPTY_TITLE_TEXT: &str = "❌ 任务标题不能为空 / Task title cannot be empty";
/// 调用过程出现异常时的通用提示；异常详情只写日志
pub const TASK_FAULT_TEXT: &str =
    "❌ 创建任务失败，请稍后重试 / Failed to create task, please try again later";

/// 截止时间固定为创建时刻之后 24 小时
pub const DUE_OFFSET_HOURS: i64 = 24;

/// 单次创建请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCreationRequest {
    pub title: String,
    /// 含来源 message_id，便于追溯
    pub description: String,
    pub due_at: DateTime<Utc>,
}

impl TaskCreationRequest {
    pub fn new(title: &str, message_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            description: task_description(message_id),
            due_at: now + Duration::hours(DUE_OFFSET_HOURS),
        }
    }

    /// ISO-8601 UTC，形如 2024-01-02T03:04:05Z
    pub fn due_at_iso(&self) -> String {
        self.due_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

pub fn task_description(message_id: &str) -> String {
    format!(
        "来自消息的任务 / Task from message\n消息ID / Message ID: {}",
        message_id
    )
}

/// 后端对创建请求的应答
#[derive(Debug, Clone)]
pub struct CreateTaskReply {
    pub status: ApiStatus,
    pub task_id: Option<String>,
}

/// 任务后端：飞书 Task v2，测试中可替换为假实现
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn create_task(
        &self,
        request: &TaskCreationRequest,
    ) -> Result<CreateTaskReply, LarkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCreationResult {
    pub outcome: TaskOutcome,
    /// 面向用户的中英双语文本
    pub user_message: String,
    /// 仅成功且后端返回了 id 时存在
    pub task_id: Option<String>,
}

impl TaskCreationResult {
    fn failed(user_message: String) -> Self {
        Self {
            outcome: TaskOutcome::Failed,
            user_message,
            task_id: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == TaskOutcome::Ok
    }
}

/// 任务创建客户端：持有共享的只读后端
pub struct TaskCreator {
    backend: Arc<dyn TaskBackend>,
}

impl TaskCreator {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Self {
        Self { backend }
    }

    /// 根据标题创建任务，截止时间为当前 UTC 时间加 24 小时
    pub async fn create_task(
        &self,
        title: &str,
        chat_id: &str,
        message_id: &str,
    ) -> TaskCreationResult {
        if title.trim().is_empty() {
            return TaskCreationResult::failed(EMPTY_TITLE_TEXT.to_string());
        }

        let request = TaskCreationRequest::new(title, message_id, Utc::now());
        tracing::info!(
            chat_id,
            message_id,
            due = %request.due_at_iso(),
            "Creating task: {}",
            title
        );

        match self.backend.create_task(&request).await {
            Ok(reply) if reply.status.success() => {
                tracing::info!(task_id = ?reply.task_id, "Task created: {}", title);
                TaskCreationResult {
                    outcome: TaskOutcome::Ok,
                    user_message: format!(
                        "✅ 任务创建成功 / Task created successfully\n任务: {}",
                        title
                    ),
                    task_id: reply.task_id,
                }
            }
            Ok(reply) => {
                tracing::warn!(
                    "create task failed, code: {}, msg: {}, log_id: {}",
                    reply.status.code,
                    reply.status.msg,
                    reply.status.log_id.as_deref().unwrap_or("-")
                );
                TaskCreationResult::failed(format!(
                    "❌ 创建任务失败 / Failed to create task: {}",
                    reply.status.msg
                ))
            }
            Err(e) => {
                tracing::error!("创建任务失败 / Failed to create task: {}", e);
                TaskCreationResult::failed(TASK_FAULT_TEXT.to_string())
            }
        }
    }
}
