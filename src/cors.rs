//! CORS configuration
//!
//! The donation page is usually served from a different origin than this
//! API, so every response carries `Access-Control-Allow-Origin`. The default
//! `*` matches what the checkout front end expects; deployments can narrow it
//! to an explicit origin list.
//!
//! # Example
//!
//! ```rust,ignore
//! use donation_server::cors::cors_layer;
//! use axum::Router;
//!
//! let app = Router::new()
//!     .route("/config", get(config_handler))
//!     .layer(cors_layer(&["https://donate.example.org".to_string()]));
//! ```

use http::{header::HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Allowed methods for the donation endpoints
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Default max age for preflight cache (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Build a CORS layer from a list of origins.
///
/// An empty list or a list containing `*` allows any origin. Entries that are
/// not valid header values are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::HeaderName::from_static("stripe-signature"),
        ])
        .max_age(Duration::from_secs(DEFAULT_MAX_AGE_SECS));

    if allows_any(origins) {
        return layer.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(values))
}

fn allows_any(origins: &[String]) -> bool {
    origins.is_empty() || origins.iter().any(|o| o.trim() == "*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_detection() {
        assert!(allows_any(&[]));
        assert!(allows_any(&["*".to_string()]));
        assert!(allows_any(&["https://a.example".to_string(), " * ".to_string()]));
        assert!(!allows_any(&["https://a.example".to_string()]));
    }

    #[test]
    fn test_layer_builds_for_lists() {
        let _ = cors_layer(&["https://a.example".to_string(), "bad\nvalue".to_string()]);
        let _ = cors_layer(&["*".to_string()]);
    }
}
