use std::env;

/// Build the Redis connection URL from the environment.
///
/// `REDIS_URL` wins when set; otherwise the URL is assembled from
/// `REDIS_HOST` (default `127.0.0.1`), `REDIS_PORT` (default `6379`)
/// and an optional `REDIS_PASSWORD`.
pub fn redis_url() -> String {
    if let Ok(url) = env::var("REDIS_URL") {
        if !url.trim().is_empty() {
            return url;
        }
    }

    let host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());

    match env::var("REDIS_PASSWORD") {
        Ok(password) if !password.is_empty() => {
            format!("redis://:{password}@{host}:{port}/0")
        }
        _ => format!("redis://{host}:{port}/0"),
    }
}
