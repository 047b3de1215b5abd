pub mod error;
pub mod models;

pub use models::{display_value, Attachment, Issue, SearchResult, UpdateRequest};

use error::{ApiError, Result};
use futures::StreamExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};
use url::Url;

/// Username/password pair sent as HTTP Basic auth on every request.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl ApiClient {
    /// `base_url` may be a bare host (`jira.example.com`), in which case
    /// HTTPS is assumed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            client: Self::http_client(None)?,
            base_url: normalize_base_url(base_url.as_ref())?,
            credentials: None,
        })
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Self::http_client(Some(timeout))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET expecting 200 and a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .send(Method::GET, path, Option::<&()>::None)
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse JSON response: {}", e);
            ApiError::InvalidResponse(e.to_string())
        })
    }

    /// PUT a JSON body; only 204 No Content counts as success.
    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        expect_status(response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// GET `path` and stream the body into `writer` chunk by chunk.
    /// Returns the number of bytes written.
    pub async fn download<W>(&self, path: &str, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self
            .send(Method::GET, path, Option::<&()>::None)
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ApiError::RequestFailed)?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        debug!(bytes = written, "Download finished");
        Ok(written)
    }

    /// Relative paths resolve against the base URL; absolute URLs (issue
    /// `self` links, attachment content links) are used as given.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.strip_prefix('/').unwrap_or(path))
            .map_err(ApiError::InvalidUrl)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = self.resolve(path)?;
        debug!(method = %method, url = %url, "Sending request");

        let mut req = self.client.request(method, url);
        req = self.apply_auth(req);
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(ApiError::RequestFailed)?;
        debug!(status = response.status().as_u16(), "Received response");
        Ok(response)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(Credentials { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            None => request,
        }
    }

    fn http_client(timeout: Option<Duration>) -> Result<Client> {
        let mut builder =
            Client::builder().user_agent(format!("jira-update/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(ApiError::RequestFailed)
    }
}

async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let mut url = Url::parse(&with_scheme)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
