//! User-visible status/error strings. Verbatim, not translated at call sites.

pub const TIMEOUT: &str = "请求超时";
pub const MAINTENANCE: &str = "配置处于维护模式";
pub const UNKNOWN: &str = "未知错误";
pub const OFFICIAL_STATUS_TIMEOUT: &str = "检查超时";
pub const OFFICIAL_STATUS_FAILED: &str = "检查失败";
pub const GROUP_NOT_FOUND: &str = "分组不存在或没有配置";
pub const UNGROUPED_DISPLAY_NAME: &str = "未分组";

pub fn operational(latency_ms: u64) -> String {
    format!("流式响应正常 ({}ms)", latency_ms)
}

pub fn degraded(latency_ms: u64) -> String {
    format!("响应成功但耗时 {}ms", latency_ms)
}

pub fn http_status(code: u16) -> String {
    format!("HTTP {}", code)
}
