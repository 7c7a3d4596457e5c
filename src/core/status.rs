//! 飞书 OpenAPI 通用响应状态

/// 每个 OpenAPI 响应都带的 code / msg，以及响应头 X-Tt-Logid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStatus {
    pub code: i64,
    pub msg: String,
    pub log_id: Option<String>,
}

impl ApiStatus {
    pub fn ok() -> Self {
        Self {
            code: 0,
            msg: "success".to_string(),
            log_id: None,
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}
