//! Static asset responder.
//!
//! # Responsibilities
//! - Serve files from the single directory aliased under /static/
//! - Reject traversal attempts with 403 before touching the filesystem
//! - Attach long-lived cache headers (public, immutable, 1-year expiry)
//!
//! # Design Decisions
//! - One alias, no directory listings, no range requests
//! - Hits and misses are not access-logged (the route bypasses logging)

use std::path::Path;
use std::time::{Duration, SystemTime};

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

const URL_PREFIX: &str = "/static/";
const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Serve the file the request path aliases, or a terminal 403/404.
pub async fn serve(root: &Path, request_path: &str) -> Response<Body> {
    let Some(relative) = request_path.strip_prefix(URL_PREFIX) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if relative.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !is_safe_relative_path(relative) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let file_path = root.join(relative);
    let bytes = match tokio::fs::read(&file_path).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let content_type = mime_guess::from_path(&file_path).first_or_octet_stream();
    let expires = httpdate::fmt_http_date(SystemTime::now() + ONE_YEAR);

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    if let Ok(value) = HeaderValue::from_str(&expires) {
        headers.insert(header::EXPIRES, value);
    }
    response
}

/// A path is safe when every segment is a plain name: no empties, no `.` or
/// `..`, no backslashes or NUL. Checked before any filesystem access.
fn is_safe_relative_path(relative: &str) -> bool {
    if relative.contains('\\') || relative.contains('\0') {
        return false;
    }
    relative
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}
