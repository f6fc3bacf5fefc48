use std::time::Duration;

use reqwest::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "SOLACE_DISABLE_SYSTEM_PROXY";

/// Upper bound for any single request to a hosted service.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_http_client() -> Client {
    let builder = Client::builder().timeout(REQUEST_TIMEOUT);
    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };

    builder.build().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Falling back to default HTTP client");
        Client::new()
    })
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}

/// Truncate an error body so large or sensitive responses are not echoed back.
pub(crate) fn truncate_body(body: String) -> String {
    const MAX_ERROR_BODY: usize = 512;
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &body[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_body_untouched() {
        assert_eq!(truncate_body("oops".to_string()), "oops");
    }

    #[test]
    fn test_long_body_truncated_on_char_boundary() {
        let body = "é".repeat(400);
        let out = truncate_body(body);
        assert!(out.ends_with("... [truncated]"));
        assert!(out.len() < 800);
    }
}
