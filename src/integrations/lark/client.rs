//! 飞书 OpenAPI 客户端
//!
//! - tenant_access_token：按 expire 缓存，剩余不足 60 秒时刷新
//! - Task v2 创建任务：POST /open-apis/task/v2/tasks
//! - IM v1 发送消息：POST /open-apis/im/v1/messages?receive_id_type=chat_id
//! - IM v1 回复消息：POST /open-apis/im/v1/messages/{message_id}/reply
//!
//! 凭证与域名在启动时设置，之后只读；唯一的可变状态是 token 缓存。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::LarkSettings;
use crate::core::{ApiStatus, LarkError};
use crate::reply::MessageSender;
use crate::task::{CreateTaskReply, TaskBackend, TaskCreationRequest};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const LOG_ID_HEADER: &str = "X-Tt-Logid";
/// token 失效类错误码：收到后丢弃缓存，下一次请求重新获取
const INVALID_TOKEN_CODES: [i64; 3] = [99991661, 99991663, 99991668];

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
    /// 有效期（秒）
    expire: Option<u64>,
}

/// OpenAPI 通用响应体
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct CreateTaskBody<'a> {
    summary: &'a str,
    description: &'a str,
    due: TaskDue,
}

#[derive(Debug, Serialize)]
struct TaskDue {
    time: String,
    /// 毫秒时间戳字符串
    timestamp: String,
    is_all_day: bool,
}

#[derive(Debug, Deserialize)]
struct CreateTaskData {
    task: Option<TaskData>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    id: Option<String>,
    guid: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    receive_id: &'a str,
    msg_type: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReplyMessageBody<'a> {
    msg_type: &'a str,
    content: &'a str,
}

/// 飞书 OpenAPI 客户端，实现任务后端与消息发送两个接口
pub struct LarkClient {
    http: reqwest::Client,
    app_id: String,
    app_secret: String,
    base_url: String,
    token: RwLock<Option<CachedToken>>,
}

impl LarkClient {
    pub fn new(settings: &LarkSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            app_id: settings.app_id.clone(),
            app_secret: settings.app_secret.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 获取 tenant_access_token（带缓存）
    async fn tenant_token(&self) -> Result<String, LarkError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut cached = self.token.write().await;
        // 等锁期间可能已被其他请求刷新
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let body = serde_json::json!({
            "app_id": self.app_id,
            "app_secret": self.app_secret,
        });
        let resp: TokenResponse = self
            .http
            .post(self.url("/open-apis/auth/v3/tenant_access_token/internal"))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if resp.code != 0 {
            return Err(LarkError::Auth(format!("code: {}, msg: {}", resp.code, resp.msg)));
        }
        let value = resp
            .tenant_access_token
            .ok_or_else(|| LarkError::Auth("No tenant_access_token in response".to_string()))?;
        let ttl = Duration::from_secs(resp.expire.unwrap_or(7200));
        tracing::debug!("Refreshed tenant_access_token, expires in {}s", ttl.as_secs());

        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(value)
    }

    /// 带鉴权的 POST；业务错误（code 非 0）作为 ApiStatus 返回，不视为 Err
    async fn post<B, T>(&self, url: &str, body: &B) -> Result<(ApiStatus, Option<T>), LarkError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.tenant_token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;

        let log_id = resp
            .headers()
            .get(LOG_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let http_status = resp.status();
        let text = resp.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            LarkError::Decode(format!("HTTP {}: {} (body: {})", http_status, e, text))
        })?;

        if INVALID_TOKEN_CODES.contains(&parsed.code) {
            tracing::warn!("tenant_access_token rejected (code {}), dropping cache", parsed.code);
            *self.token.write().await = None;
        }

        let status = ApiStatus {
            code: parsed.code,
            msg: parsed.msg,
            log_id,
        };
        Ok((status, parsed.data))
    }
}

#[async_trait]
impl TaskBackend for LarkClient {
    async fn create_task(
        &self,
        request: &TaskCreationRequest,
    ) -> Result<CreateTaskReply, LarkError> {
        let body = CreateTaskBody {
            summary: &request.title,
            description: &request.description,
            due: TaskDue {
                time: request.due_at_iso(),
                timestamp: request.due_at.timestamp_millis().to_string(),
                is_all_day: false,
            },
        };
        let (status, data) = self
            .post::<_, CreateTaskData>(&self.url("/open-apis/task/v2/tasks"), &body)
            .await?;
        let task_id = data
            .and_then(|d| d.task)
            .and_then(|t| t.id.or(t.guid));
        Ok(CreateTaskReply { status, task_id })
    }
}

#[async_trait]
impl MessageSender for LarkClient {
    async fn create_message(&self, chat_id: &str, content: &str) -> Result<ApiStatus, LarkError> {
        let body = SendMessageBody {
            receive_id: chat_id,
            msg_type: "text",
            content,
        };
        let url = self.url("/open-apis/im/v1/messages?receive_id_type=chat_id");
        let (status, _) = self.post::<_, serde_json::Value>(&url, &body).await?;
        Ok(status)
    }

    async fn reply_message(&self, message_id: &str, content: &str) -> Result<ApiStatus, LarkError> {
        let body = ReplyMessageBody {
            msg_type: "text",
            content,
        };
        let url = self.url(&format!("/open-apis/im/v1/messages/{}/reply", message_id));
        let (status, _) = self.post::<_, serde_json::Value>(&url, &body).await?;
        Ok(status)
    }
}
