//! 错误类型
//!
//! 每个边界一个枚举：飞书 OpenAPI 调用（LarkError）、消息内容解析（IntakeError）、回复投递（DispatchError）。
//! 它们最终都落为一条回复文本或一行日志，不会向上冒泡导致进程退出。

use thiserror::Error;

/// 飞书 OpenAPI 客户端错误（网络、鉴权、响应解析）
#[derive(Error, Debug)]
pub enum LarkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 获取 tenant_access_token 失败（code 非 0 或缺少 token）
    #[error("Auth failed: {0}")]
    Auth(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// 入站消息 content 解析错误
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid message content: {0}")]
    InvalidContent(#[from] serde_json::Error),

    #[error("Message content has no text field")]
    MissingText,
}

/// 回复投递错误：仅写入日志，不再回传到会话
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{op} failed, code: {code}, msg: {msg}, log_id: {log_id}")]
    Rejected {
        op: &'static str,
        code: i64,
        msg: String,
        log_id: String,
    },

    #[error("{op} error: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: LarkError,
    },
}
