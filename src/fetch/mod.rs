mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let resp = client.get(url.parse()?).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Location of a subject's portrait under `base_url`.
pub fn image_url(base_url: &str, name: &str) -> String {
    format!(
        "{}/{}.webp",
        base_url.trim_end_matches('/'),
        name.trim().to_lowercase()
    )
}

/// Fetches `url` on a background task and reports whether it succeeded.
///
/// Failures are logged and never surface to the caller; dropping the handle
/// detaches the task.
pub fn spawn_image_probe(client: Arc<dyn HttpClient>, url: String) -> JoinHandle<bool> {
    tokio::spawn(async move {
        match fetch_bytes(client.as_ref(), &url).await {
            Ok(bytes) => {
                debug!(url = %url, bytes = bytes.len(), "Subject image reachable");
                true
            }
            Err(e) => {
                error!(url = %url, error = %e, "Subject image fetch failed");
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("https://img.example/cats/", " Tabby "),
            "https://img.example/cats/tabby.webp"
        );
    }

    #[tokio::test]
    async fn test_failed_probe_is_suppressed() {
        let client = BasicClient::with_timeout(Duration::from_secs(2)).unwrap();
        let handle = spawn_image_probe(Arc::new(client), "http://127.0.0.1:9/tabby.webp".into());
        assert!(!handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_url_is_an_error() {
        let client = BasicClient::new();
        assert!(fetch_bytes(&client, "not a url").await.is_err());
    }
}
