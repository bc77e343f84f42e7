use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    TransportFailure(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("remote URL cannot carry a path: {0}")]
    InvalidBase(String),
    #[error("{}: {}", .0, display_body(.1))]
    HttpStatus(StatusCode, String),
}

/// The server's `{ "error": .. }` message, or the raw body if it isn't one
fn display_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_shows_server_message() {
        let err = ApiError::HttpStatus(
            StatusCode::NOT_FOUND,
            r#"{"error":"Paste not found"}"#.to_string(),
        );
        assert_eq!(err.to_string(), "404 Not Found: Paste not found");
    }

    #[test]
    fn test_status_falls_back_to_raw_body() {
        let err = ApiError::HttpStatus(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert_eq!(err.to_string(), "502 Bad Gateway: upstream down");

        let err = ApiError::HttpStatus(StatusCode::BAD_REQUEST, r#"{"msg":"nope"}"#.to_string());
        assert_eq!(err.to_string(), r#"400 Bad Request: {"msg":"nope"}"#);
    }
}
