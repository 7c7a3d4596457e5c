//! 飞书任务机器人
//!
//! 模块划分：
//! - **command**: 命令识别（「创建任务:」/「create task:」触发词）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与 OpenAPI 响应状态
//! - **integrations**: 飞书 Webhook 事件接入与 OpenAPI 客户端
//! - **message**: 入站消息事件
//! - **observability**: 日志初始化
//! - **pipeline**: 事件 → 命令 → 任务 → 回复 的处理流水线
//! - **reply**: 回复组装与投递（单聊发送 / 群聊回复）
//! - **task**: 任务创建客户端

pub mod command;
pub mod config;
pub mod core;
pub mod integrations;
pub mod message;
pub mod observability;
pub mod pipeline;
pub mod reply;
pub mod task;

pub use command::{interpret, CommandOutcome};
pub use message::{ChatType, InboundMessageEvent, MessageType};
pub use pipeline::Pipeline;
