//! 飞书事件回调载荷（兼容 v1 与 v2.0 格式）

use serde::Deserialize;

use crate::message::{ChatType, InboundMessageEvent, MessageType};

pub const MESSAGE_RECEIVE_EVENT: &str = "im.message.receive_v1";

/// 事件回调顶层
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub challenge: Option<String>,
    /// v1 与 url_verification 的 Verification Token
    pub token: Option<String>,
    /// v2.0 格式：header 内含 event_type、event_id、token
    pub header: Option<EventHeader>,
    pub event: Option<EventData>,
    /// 若配置了 Encrypt Key，飞书会发送加密体
    pub encrypt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventHeader {
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub token: Option<String>,
}

/// 事件数据（v1 的 event 或 v2 的 event）
#[derive(Debug, Deserialize)]
pub struct EventData {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub event_id: Option<String>,
    pub message: Option<MessageData>,
}

#[derive(Debug, Deserialize)]
pub struct MessageData {
    pub chat_id: Option<String>,
    pub chat_type: Option<String>,
    pub content: Option<String>,
    pub message_id: Option<String>,
    pub message_type: Option<String>,
}

impl EventPayload {
    pub fn is_url_verification(&self) -> bool {
        self.type_.as_deref() == Some("url_verification")
    }

    pub fn token(&self) -> Option<&str> {
        self.header
            .as_ref()
            .and_then(|h| h.token.as_deref())
            .or(self.token.as_deref())
    }

    pub fn event_type(&self) -> Option<&str> {
        self.header
            .as_ref()
            .and_then(|h| h.event_type.as_deref())
            .or_else(|| self.event.as_ref().and_then(|e| e.type_.as_deref()))
    }

    pub fn event_id(&self) -> Option<&str> {
        self.header
            .as_ref()
            .and_then(|h| h.event_id.as_deref())
            .or_else(|| self.event.as_ref().and_then(|e| e.event_id.as_deref()))
            .filter(|id| !id.is_empty())
    }
}

impl MessageData {
    /// 缺少 chat_id / message_id 的消息无法回复，返回 None
    pub fn into_inbound(self) -> Option<InboundMessageEvent> {
        let chat_id = self.chat_id.filter(|s| !s.is_empty())?;
        let message_id = self.message_id.filter(|s| !s.is_empty())?;
        Some(InboundMessageEvent {
            message_type: MessageType::parse(self.message_type.as_deref().unwrap_or_default()),
            chat_id,
            message_id,
            chat_type: ChatType::parse(self.chat_type.as_deref().unwrap_or_default()),
            raw_content: self.content.unwrap_or_default(),
        })
    }
}
