mod storage;

pub use storage::{UploadTarget, UploadTargets};

use {
    crate::error::{ApiError, RequestId, TransportError},
    reqwest::{Response, StatusCode, Url},
    secretshare_protocol::{
        endpoints::{
            Ping, PingResponse, RequestToResponse, ServerVersionResponse, Upload, UploadResponse,
            VERSION_PATH,
        },
        util::endpoint_url,
    },
    serde::{Serialize, de::DeserializeOwned},
    std::{future::Future, time::Duration},
    tracing::{debug, instrument},
};

/// The secretshare server: checks credentials and hands out upload targets.
pub trait Backend {
    fn ping(
        &self,
        endpoint: &str,
        request: &Ping,
    ) -> impl Future<Output = Result<PingResponse, ApiError>> + Send;

    fn request_upload(
        &self,
        endpoint: &str,
        request: &Upload,
    ) -> impl Future<Output = Result<UploadResponse, ApiError>> + Send;
}

/// Object storage reached through pre-signed or public URLs.
pub trait Storage {
    fn put(
        &self,
        target: &UploadTarget,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn get(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

impl<B: Backend> Backend for &B {
    #[inline]
    fn ping(
        &self,
        endpoint: &str,
        request: &Ping,
    ) -> impl Future<Output = Result<PingResponse, ApiError>> + Send {
        (**self).ping(endpoint, request)
    }

    #[inline]
    fn request_upload(
        &self,
        endpoint: &str,
        request: &Upload,
    ) -> impl Future<Output = Result<UploadResponse, ApiError>> + Send {
        (**self).request_upload(endpoint, request)
    }
}

impl<S: Storage> Storage for &S {
    #[inline]
    fn put(
        &self,
        target: &UploadTarget,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).put(target, body)
    }

    #[inline]
    fn get(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        (**self).get(url)
    }
}

/// HTTP client for both the secretshare server and object storage.
///
/// Reuse created client or clone it in order to reuse a connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    reqwest: reqwest::Client,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Loading large files may take a long time.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3600);

#[must_use]
#[inline]
pub fn upload_timeout(upload_size: u64) -> Duration {
    // Assuming upload speed above 1 MB/s.
    DEFAULT_TIMEOUT.saturating_add(Duration::from_micros(upload_size))
}

impl Client {
    #[inline]
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            reqwest: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()?,
        })
    }

    #[instrument(skip_all)]
    #[inline(never)]
    pub async fn request<R>(&self, endpoint: &str, request: &R) -> Result<R::Response, ApiError>
    where
        R: RequestToResponse + Serialize + Send + Sync,
        R::Response: DeserializeOwned + Send + Sync,
    {
        let url = endpoint_url(endpoint, R::PATH)?;
        debug!(path = R::PATH, host = url.host_str(), "calling secretshare server");
        let response = self.reqwest.post(url).json(request).send().await?;
        read_api_response(response).await
    }

    #[instrument(skip_all)]
    #[inline]
    pub async fn server_version(&self, endpoint: &str) -> Result<ServerVersionResponse, ApiError> {
        let url = endpoint_url(endpoint, VERSION_PATH)?;
        let response = self.reqwest.get(url).send().await?;
        read_api_response(response).await
    }
}

impl Backend for Client {
    #[inline]
    async fn ping(&self, endpoint: &str, request: &Ping) -> Result<PingResponse, ApiError> {
        self.request(endpoint, request).await
    }

    #[inline]
    async fn request_upload(
        &self,
        endpoint: &str,
        request: &Upload,
    ) -> Result<UploadResponse, ApiError> {
        self.request(endpoint, request).await
    }
}

async fn read_api_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let req_id = RequestId::from_headers(response.headers());
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized { req_id }),
        StatusCode::INTERNAL_SERVER_ERROR => return Err(ApiError::Internal { req_id }),
        _ => {}
    }
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status,
            req_id,
            body,
        });
    }
    serde_json::from_str(&body).map_err(|source| ApiError::Malformed { body, source })
}
