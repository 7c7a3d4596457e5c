//! 命令识别
//!
//! 从文本消息中识别「创建任务」指令并取出任务标题。
//! 触发词按优先级顺序扫描：中文「创建任务:」（区分大小写）优先于英文「create task:」（不区分大小写）。
//! 匹配是子串查找而非前缀匹配，标题为触发词首次出现之后的全部内容（去掉首尾空白）。

use serde::Deserialize;

use crate::core::IntakeError;
use crate::message::{InboundMessageEvent, MessageType};

pub const ZH_TRIGGER: &str = "创建任务:";
pub const EN_TRIGGER: &str = "create task:";

pub const UNSUPPORTED_TYPE_TEXT: &str = "只支持文本消息 / Only text messages are supported";
pub const PROCESS_FAILED_TEXT: &str =
    "处理消息失败，请发送文本消息 / Failed to process message, please send text message";

/// 命中的触发词
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Chinese,
    English,
}

struct TriggerPattern {
    kind: TriggerKind,
    phrase: &'static str,
    ignore_case: bool,
}

/// 按优先级排列；两个触发词同时出现时取靠前的一个
const TRIGGERS: [TriggerPattern; 2] = [
    TriggerPattern {
        kind: TriggerKind::Chinese,
        phrase: ZH_TRIGGER,
        ignore_case: false,
    },
    TriggerPattern {
        kind: TriggerKind::English,
        phrase: EN_TRIGGER,
        ignore_case: true,
    },
];

/// 触发词扫描结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandMatch<'a> {
    NoMatch,
    Matched {
        kind: TriggerKind,
        /// 触发词之后的原文（未裁剪）
        remainder: &'a str,
    },
}

/// 命令识别结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 非命令：直接回复该文本
    NotACommand(String),
    /// 创建任务，携带已裁剪的标题（可能为空，由任务客户端校验）
    TaskCommand(String),
}

#[derive(Debug, Deserialize)]
struct TextContent {
    text: Option<String>,
}

/// 扫描触发词，返回第一个命中的模式及其后的原文
pub fn match_trigger(text: &str) -> CommandMatch<'_> {
    for pattern in &TRIGGERS {
        let pos = if pattern.ignore_case {
            find_ignore_ascii_case(text, pattern.phrase)
        } else {
            text.find(pattern.phrase)
        };
        if let Some(pos) = pos {
            return CommandMatch::Matched {
                kind: pattern.kind,
                remainder: &text[pos + pattern.phrase.len()..],
            };
        }
    }
    CommandMatch::NoMatch
}

/// ASCII 大小写不敏感的子串查找。needle 必须是 ASCII，因此命中位置一定落在字符边界上。
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || n.len() > h.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// 从 content JSON 中取出 text 字段
pub fn extract_text(raw_content: &str) -> Result<String, IntakeError> {
    let content: TextContent = serde_json::from_str(raw_content)?;
    content.text.ok_or(IntakeError::MissingText)
}

/// 非命令消息的回显 + 用法提示
pub fn help_text(text: &str) -> String {
    format!(
        "收到消息: {}\n\n💡 提示: 发送 \"创建任务: [任务标题]\" 来创建任务\n\
         Tip: Send \"create task: [task title]\" to create a task",
        text
    )
}

/// 解释一条入站消息（纯函数，同一事件多次调用结果相同）
pub fn interpret(event: &InboundMessageEvent) -> CommandOutcome {
    if event.message_type != MessageType::Text {
        return CommandOutcome::NotACommand(UNSUPPORTED_TYPE_TEXT.to_string());
    }

    let text = match extract_text(&event.raw_content) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(
                "处理消息失败 / Error processing message {}: {}",
                event.message_id,
                e
            );
            return CommandOutcome::NotACommand(PROCESS_FAILED_TEXT.to_string());
        }
    };

    match match_trigger(&text) {
        CommandMatch::Matched { remainder, .. } => {
            CommandOutcome::TaskCommand(remainder.trim().to_string())
        }
        CommandMatch::NoMatch => CommandOutcome::NotACommand(help_text(&text)),
    }
}
