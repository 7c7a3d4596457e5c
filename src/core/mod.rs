//! 核心类型：错误与 OpenAPI 响应状态

pub mod error;
pub mod status;

pub use error::{DispatchError, IntakeError, LarkError};
pub use status::ApiStatus;
