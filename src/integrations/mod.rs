//! 外部集成：飞书（事件订阅 Webhook + OpenAPI）

pub mod lark;
