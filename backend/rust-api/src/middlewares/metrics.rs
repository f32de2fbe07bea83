use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency per method, normalized path and status.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Collapses module and resource ids into `{id}` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    let mut previous = "";
    let normalized: Vec<&str> = path
        .split('/')
        .map(|segment| {
            let is_id = (matches!(previous, "modules" | "resources") && !segment.is_empty())
                || is_uuid_like(segment)
                || is_numeric_id(segment);
            previous = segment;
            if is_id {
                "{id}"
            } else {
                segment
            }
        })
        .collect();

    normalized.join("/")
}

fn is_uuid_like(s: &str) -> bool {
    s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/api/v1/session/modules/module-1-1718000000000/activate"),
            "/api/v1/session/modules/{id}/activate"
        );
        assert_eq!(
            normalize_path("/api/v1/session/resources/video-module-1-1718000000000-a1b2c/quiz"),
            "/api/v1/session/resources/{id}/quiz"
        );
        assert_eq!(normalize_path("/api/v1/resources"), "/api/v1/resources");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_is_uuid_like() {
        assert!(is_uuid_like("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_uuid_like("not-a-uuid"));
    }

    #[test]
    fn test_is_numeric_id() {
        assert!(is_numeric_id("123"));
        assert!(!is_numeric_id("abc"));
        assert!(!is_numeric_id(""));
    }
}
