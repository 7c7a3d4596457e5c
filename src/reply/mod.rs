//! 回复组装与投递
//!
//! 组装：把上游文本包装成 {"text": ...} 的消息 content。
//! 投递：单聊用「发送消息」发到 chat_id，群聊用「回复消息」回复原消息。
//! 投递失败只写日志，不再尝试第二次回复。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{ApiStatus, DispatchError, LarkError};
use crate::message::{ChatType, InboundMessageEvent};
use crate::task::TaskCreationResult;

/// 投递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// 发送新消息到会话（receive_id_type = chat_id）
    SendToChat,
    /// 在群聊中回复原消息
    ReplyToMessage,
}

/// 待发送的回复，仅在一次投递调用内存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub text: String,
    /// SendToChat 时为 chat_id，ReplyToMessage 时为 message_id
    pub target: String,
    pub delivery_mode: DeliveryMode,
}

impl OutboundReply {
    pub fn for_event(event: &InboundMessageEvent, text: String) -> Self {
        let (delivery_mode, target) = match event.chat_type {
            ChatType::Peer => (DeliveryMode::SendToChat, event.chat_id.clone()),
            ChatType::Group => (DeliveryMode::ReplyToMessage, event.message_id.clone()),
        };
        Self {
            text,
            target,
            delivery_mode,
        }
    }

    /// 文本消息 content：{"text": "..."}
    pub fn content(&self) -> String {
        text_content(&self.text)
    }
}

/// 上游结果：非命令的展示文本，或任务创建结果
pub enum ReplySource<'a> {
    NotACommand(&'a str),
    Task(&'a TaskCreationResult),
}

/// 选出要转发给用户的文本
pub fn compose(source: ReplySource<'_>) -> String {
    match source {
        ReplySource::NotACommand(text) => text.to_string(),
        ReplySource::Task(result) => result.user_message.clone(),
    }
}

pub fn text_content(text: &str) -> String {
    serde_json::json!({ "text": text }).to_string()
}

/// 消息发送接口：飞书 IM v1，测试中可替换为假实现
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// 发送新消息到 chat_id
    async fn create_message(&self, chat_id: &str, content: &str) -> Result<ApiStatus, LarkError>;

    /// 回复指定消息
    async fn reply_message(&self, message_id: &str, content: &str) -> Result<ApiStatus, LarkError>;
}

/// 回复投递器
pub struct ReplyDispatcher {
    sender: Arc<dyn MessageSender>,
}

impl ReplyDispatcher {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }

    /// 为事件投递一条回复；失败写入日志后吞掉
    pub async fn dispatch(&self, event: &InboundMessageEvent, text: String) {
        let reply = OutboundReply::for_event(event, text);
        match self.deliver(&reply).await {
            Ok(()) => tracing::debug!(
                "Reply delivered via {:?} to {}",
                reply.delivery_mode,
                reply.target
            ),
            Err(e) => tracing::error!("发送消息失败 / Failed to send message: {}", e),
        }
    }

    /// 发起唯一一次网络调用，并把 success=false 转为 DispatchError
    pub async fn deliver(&self, reply: &OutboundReply) -> Result<(), DispatchError> {
        let content = reply.content();
        let (op, result) = match reply.delivery_mode {
            DeliveryMode::SendToChat => (
                "im.v1.message.create",
                self.sender.create_message(&reply.target, &content).await,
            ),
            DeliveryMode::ReplyToMessage => (
                "im.v1.message.reply",
                self.sender.reply_message(&reply.target, &content).await,
            ),
        };

        let status = result.map_err(|source| DispatchError::Transport { op, source })?;
        if !status.success() {
            return Err(DispatchError::Rejected {
                op,
                code: status.code,
                msg: status.msg,
                log_id: status.log_id.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
