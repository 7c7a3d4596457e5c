//! 入站消息事件（由传输层解析 Webhook 后构造，每个事件只被处理一次）

/// 消息类型：只有文本消息可以触发命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Other(String),
}

impl MessageType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "text" => Self::Text,
            other => Self::Other(other.to_string()),
        }
    }
}

/// 会话类型：决定回复方式（单聊发新消息，群聊按消息回复）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatType {
    /// 单聊（飞书 chat_type = "p2p"）
    Peer,
    Group,
}

impl ChatType {
    /// 除 "p2p" 外一律按群聊处理
    pub fn parse(raw: &str) -> Self {
        if raw == "p2p" {
            Self::Peer
        } else {
            Self::Group
        }
    }
}

#[derive(Debug, Clone)]
pub struct InboundMessageEvent {
    pub message_type: MessageType,
    pub chat_id: String,
    pub message_id: String,
    pub chat_type: ChatType,
    /// 原始 content：JSON 字符串，文本消息形如 {"text": "..."}
    pub raw_content: String,
}

impl InboundMessageEvent {
    /// 构造一条文本消息事件，content 按飞书格式编码
    pub fn text(chat_id: &str, message_id: &str, chat_type: ChatType, text: &str) -> Self {
        Self {
            message_type: MessageType::Text,
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
            chat_type,
            raw_content: serde_json::json!({ "text": text }).to_string(),
        }
    }
}
