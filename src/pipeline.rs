//! 消息处理流水线
//!
//! 事件 → 命令识别 → 任务创建 → 组装回复 → 投递。
//! 每个可回复的事件恰好产生一次投递调用；事件之间不共享可变状态。

use std::sync::Arc;

use crate::command::{interpret, CommandOutcome};
use crate::message::InboundMessageEvent;
use crate::reply::{compose, MessageSender, ReplyDispatcher, ReplySource};
use crate::task::{TaskBackend, TaskCreator};

/// 预构建的处理组件，可被多个并发事件共享
pub struct Pipeline {
    creator: TaskCreator,
    dispatcher: ReplyDispatcher,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn TaskBackend>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            creator: TaskCreator::new(backend),
            dispatcher: ReplyDispatcher::new(sender),
        }
    }

    /// 计算回复文本（识别命令，必要时创建任务），不做投递
    pub async fn process(&self, event: &InboundMessageEvent) -> String {
        match interpret(event) {
            CommandOutcome::NotACommand(text) => compose(ReplySource::NotACommand(&text)),
            CommandOutcome::TaskCommand(title) => {
                let result = self
                    .creator
                    .create_task(&title, &event.chat_id, &event.message_id)
                    .await;
                compose(ReplySource::Task(&result))
            }
        }
    }

    /// 处理一个事件并投递唯一的一条回复
    pub async fn handle_event(&self, event: &InboundMessageEvent) {
        tracing::info!(
            chat_id = %event.chat_id,
            message_id = %event.message_id,
            chat_type = ?event.chat_type,
            "收到消息 / Received message"
        );
        let text = self.process(event).await;
        self.dispatcher.dispatch(event, text).await;
    }
}
