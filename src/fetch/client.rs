use async_trait::async_trait;
use reqwest::{Method, Request, Response};

/// Sends requests for auxiliary assets such as subject portraits.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// Issues a plain GET for `url`.
    async fn get(&self, url: reqwest::Url) -> reqwest::Result<Response> {
        self.execute(Request::new(Method::GET, url)).await
    }
}
