//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TASKBOT__*` 覆盖（双下划线表示嵌套，如 `TASKBOT__LARK__APP_ID=cli_xxx`）。
//! 兼容飞书示例程序的 `APP_ID` / `APP_SECRET` / `BASE_DOMAIN`：仅在对应字段仍为空时填充。

use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub lark: LarkSettings,
    pub server: ServerSection,
}

/// [lark] 段：应用凭证与 OpenAPI 域名（国际版用 https://open.larksuite.com）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LarkSettings {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    /// 事件订阅的 Verification Token；未设置时不校验
    pub verification_token: Option<String>,
}

impl Default for LarkSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            verification_token: None,
        }
    }
}

impl LarkSettings {
    /// 启动时校验凭证是否齐全
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "lark.app_id is empty (set TASKBOT__LARK__APP_ID or APP_ID)".to_string(),
            ));
        }
        if self.app_secret.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "lark.app_secret is empty (set TASKBOT__LARK__APP_SECRET or APP_SECRET)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// [server] 段：Webhook 监听地址与事件去重容量
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// 已处理 event_id 的缓存上限，超过后整体清空
    pub dedup_capacity: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            dedup_capacity: 10_000,
        }
    }
}

impl AppConfig {
    /// 用旧式环境变量补齐空字段；lookup 便于测试时注入
    pub fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.lark.app_id.is_empty() {
            if let Some(v) = lookup("APP_ID") {
                self.lark.app_id = v;
            }
        }
        if self.lark.app_secret.is_empty() {
            if let Some(v) = lookup("APP_SECRET") {
                self.lark.app_secret = v;
            }
        }
        if self.lark.base_url.is_empty() || self.lark.base_url == DEFAULT_BASE_URL {
            if let Some(v) = lookup("BASE_DOMAIN") {
                self.lark.base_url = v;
            }
        }
        self.lark.base_url = self.lark.base_url.trim_end_matches('/').to_string();
    }
}

/// 从 config 目录加载配置，环境变量 TASKBOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 TASKBOT__*（双下划线表示嵌套键）
/// 4. 最后用 APP_ID / APP_SECRET / BASE_DOMAIN 补齐空字段
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("Config file {} not found, skipping", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TASKBOT")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.apply_env_fallbacks(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    Ok(cfg)
}
