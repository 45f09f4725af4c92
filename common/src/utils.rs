use log::{debug, trace};
use std::future::Future;
use tokio::task::JoinHandle;

// Make sure a user-supplied provider address is a usable websocket URL
pub fn sanitize_ws_address(target: &str) -> String {
    let mut target = target.to_lowercase();
    if target.starts_with("https://") {
        target.replace_range(..8, "wss://");
    } else if target.starts_with("http://") {
        target.replace_range(..7, "ws://");
    } else if !target.starts_with("ws://") && !target.starts_with("wss://") {
        target.insert_str(0, "ws://");
    }

    if target.ends_with('/') {
        target.pop();
    }

    target
}

// Spawn a named tokio task, tracing its lifecycle
pub fn spawn_task<F>(name: &'static str, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    trace!("Spawning task '{}'", name);
    tokio::spawn(async move {
        let result = future.await;
        debug!("Task '{}' has exited", name);
        result
    })
}

#[cfg(feature = "prompt")]
// Render a unix timestamp in seconds for terminal output
pub fn format_timestamp(seconds: u64) -> String {
    use chrono::{TimeZone, Utc};
    match Utc.timestamp_opt(seconds as i64, 0) {
        chrono::LocalResult::Single(datetime) => {
            datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        }
        _ => format!("{}s", seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_ws_address() {
        assert_eq!(sanitize_ws_address("127.0.0.1:8546"), "ws://127.0.0.1:8546");
        assert_eq!(
            sanitize_ws_address("http://127.0.0.1:8546/"),
            "ws://127.0.0.1:8546"
        );
        assert_eq!(
            sanitize_ws_address("https://wallet.example.org"),
            "wss://wallet.example.org"
        );
        assert_eq!(
            sanitize_ws_address("wss://wallet.example.org"),
            "wss://wallet.example.org"
        );
    }
}
