//! 飞书（Lark）集成
//!
//! 通过事件订阅 Webhook 接收消息，交给处理流水线后回复。
//! 支持单聊和群聊。
//!
//! 重要：飞书要求 Webhook 在 **3 秒内** 返回 200，否则判失败并重试。
//! 本模块在解析事件后立即返回，任务创建与回复在后台异步执行。

pub mod client;
pub mod event;

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::RwLock;

use crate::pipeline::Pipeline;

pub use client::LarkClient;
pub use event::{EventPayload, MESSAGE_RECEIVE_EVENT};

/// 已处理事件 ID 缓存（用于去重，防止飞书重试时重复处理）
pub type ProcessedEvents = Arc<RwLock<HashSet<String>>>;

/// 飞书服务状态
pub struct LarkState {
    pub pipeline: Arc<Pipeline>,
    pub processed_events: ProcessedEvents,
    pub verification_token: Option<String>,
    pub dedup_capacity: usize,
}

impl LarkState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            processed_events: Arc::new(RwLock::new(HashSet::new())),
            verification_token: None,
            dedup_capacity: 10_000,
        }
    }

    pub fn with_verification_token(mut self, token: Option<String>) -> Self {
        self.verification_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity.max(1);
        self
    }

    /// 记录 event_id，已见过则返回 false
    async fn first_delivery(&self, event_id: &str) -> bool {
        let mut processed = self.processed_events.write().await;
        if processed.contains(event_id) {
            return false;
        }
        if processed.len() >= self.dedup_capacity {
            processed.clear();
        }
        processed.insert(event_id.to_string());
        true
    }
}

/// 创建飞书路由
pub fn create_router(state: Arc<LarkState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// POST /webhook - 接收飞书事件（URL 校验 + 消息回调）
async fn webhook_handler(
    State(state): State<Arc<LarkState>>,
    Json(payload): Json<EventPayload>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    tracing::debug!(
        "Lark webhook received: type={:?} event_type={:?}",
        payload.type_.as_deref(),
        payload.event_type()
    );

    if payload.encrypt.is_some() {
        tracing::warn!(
            "Lark webhook: payload is encrypted (Encrypt Key enabled). \
             Remove Encrypt Key in Lark console (事件订阅 -> 加密配置)."
        );
        return Ok(Json(serde_json::json!({})));
    }

    if let Some(expected) = state.verification_token.as_deref() {
        if payload.token() != Some(expected) {
            tracing::warn!("Lark webhook: verification token mismatch, rejecting");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    if payload.is_url_verification() {
        return match payload.challenge {
            Some(challenge) => Ok(Json(serde_json::json!({ "challenge": challenge }))),
            None => Err(StatusCode::BAD_REQUEST),
        };
    }

    let event_type = payload.event_type();
    if event_type != Some(MESSAGE_RECEIVE_EVENT) {
        tracing::info!("Lark webhook: event type {:?} ignored", event_type);
        return Ok(Json(serde_json::json!({})));
    }

    if let Some(event_id) = payload.event_id() {
        if !state.first_delivery(event_id).await {
            tracing::debug!("Duplicate event ignored: {}", event_id);
            return Ok(Json(serde_json::json!({})));
        }
    }

    let Some(message) = payload.event.and_then(|e| e.message) else {
        tracing::warn!("Lark webhook: no message in event, ignoring");
        return Ok(Json(serde_json::json!({})));
    };
    let Some(event) = message.into_inbound() else {
        tracing::warn!("Lark webhook: message without chat_id/message_id, cannot reply");
        return Ok(Json(serde_json::json!({})));
    };

    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        pipeline.handle_event(&event).await;
    });

    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::core::{ApiStatus, LarkError};
    use crate::reply::MessageSender;
    use crate::task::{CreateTaskReply, TaskBackend, TaskCreationRequest};

    #[derive(Default)]
    struct FakeLark {
        task_calls: AtomicUsize,
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TaskBackend for FakeLark {
        async fn create_task(
            &self,
            _request: &TaskCreationRequest,
        ) -> Result<CreateTaskReply, LarkError> {
            self.task_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CreateTaskReply {
                status: ApiStatus::ok(),
                task_id: Some("T1".to_string()),
            })
        }
    }

    #[async_trait]
    impl MessageSender for FakeLark {
        async fn create_message(
            &self,
            chat_id: &str,
            content: &str,
        ) -> Result<ApiStatus, LarkError> {
            self.sent.lock().unwrap().push((chat_id.to_string(), content.to_string()));
            Ok(ApiStatus::ok())
        }

        async fn reply_message(
            &self,
            message_id: &str,
            content: &str,
        ) -> Result<ApiStatus, LarkError> {
            self.sent.lock().unwrap().push((message_id.to_string(), content.to_string()));
            Ok(ApiStatus::ok())
        }
    }

    fn router(fake: Arc<FakeLark>, token: Option<&str>) -> Router {
        let pipeline = Arc::new(Pipeline::new(fake.clone(), fake));
        let state = LarkState::new(pipeline).with_verification_token(token.map(str::to_string));
        create_router(Arc::new(state))
    }

    fn message_event(event_id: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "schema": "2.0",
            "header": {
                "event_id": event_id,
                "event_type": "im.message.receive_v1",
                "token": "vt"
            },
            "event": {
                "message": {
                    "message_id": "om_1",
                    "chat_id": "oc_1",
                    "chat_type": "p2p",
                    "message_type": "text",
                    "content": serde_json::json!({ "text": text }).to_string()
                }
            }
        })
    }

    async fn post_json(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    async fn wait_for_sent(fake: &FakeLark, n: usize) {
        for _ in 0..100 {
            if fake.sent.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_url_verification_echoes_challenge() {
        let app = router(Arc::new(FakeLark::default()), None);
        let (status, body) = post_json(
            app,
            serde_json::json!({ "type": "url_verification", "challenge": "c-123", "token": "vt" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["challenge"], "c-123");
    }

    #[tokio::test]
    async fn test_token_mismatch_rejected() {
        let fake = Arc::new(FakeLark::default());
        let app = router(fake.clone(), Some("other"));
        let (status, _) = post_json(app, message_event("ev_1", "创建任务: x")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fake.task_calls.load(Ordering::SeqCst), 0);
        assert!(fake.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_event_creates_task_and_replies() {
        let fake = Arc::new(FakeLark::default());
        let app = router(fake.clone(), Some("vt"));
        let (status, _) = post_json(app, message_event("ev_1", "创建任务: 写报告")).await;
        assert_eq!(status, StatusCode::OK);

        wait_for_sent(&fake, 1).await;
        let sent = fake.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "oc_1");
        assert!(sent[0].1.contains("写报告"));
        assert_eq!(fake.task_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_event_processed_once() {
        let fake = Arc::new(FakeLark::default());
        let app = router(fake.clone(), None);
        post_json(app.clone(), message_event("ev_dup", "hello")).await;
        post_json(app, message_event("ev_dup", "hello")).await;

        wait_for_sent(&fake, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fake.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_event_types_ignored() {
        let fake = Arc::new(FakeLark::default());
        let app = router(fake.clone(), None);
        let (status, _) = post_json(
            app,
            serde_json::json!({
                "schema": "2.0",
                "header": { "event_id": "ev_2", "event_type": "im.chat.member.bot.added_v1" },
                "event": {}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fake.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Arc::new(FakeLark::default()), None);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dedup_capacity_clears_when_full() {
        let state = LarkState::new(Arc::new(Pipeline::new(
            Arc::new(FakeLark::default()),
            Arc::new(FakeLark::default()),
        )))
        .with_dedup_capacity(2);
        assert!(state.first_delivery("a").await);
        assert!(state.first_delivery("b").await);
        assert!(!state.first_delivery("b").await);
        assert!(state.first_delivery("c").await);
        assert!(state.first_delivery("a").await);
    }
}
