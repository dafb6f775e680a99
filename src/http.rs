use std::time::Duration;

/// 共享 HTTP 客户端构建；`LLM_PROXY` 同时作用于表格下载、同步与 LLM 请求
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if let Ok(raw) = std::env::var("LLM_PROXY") {
        let t = raw.trim();
        if !t.is_empty() {
            let url = if t.contains("://") {
                t.to_string()
            } else {
                format!("socks5h://{}", t)
            };
            builder = builder.proxy(reqwest::Proxy::all(&url)?);
        }
    }

    builder.build()
}
