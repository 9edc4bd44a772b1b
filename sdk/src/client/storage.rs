use {
    super::{Client, RESPONSE_TIMEOUT, Storage, upload_timeout},
    crate::error::{ApiError, TransportError, UploadPart},
    reqwest::{Url, header::CONTENT_LENGTH},
    secretshare_protocol::endpoints::{HeaderMap, UploadResponse},
    std::fmt,
    tracing::{debug, instrument},
};

/// A pre-signed `PUT` location and the headers its signature covers.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl UploadTarget {
    #[inline]
    pub fn new(url: &str, headers: &HeaderMap) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(url)?,
            headers: headers
                .iter()
                .flat_map(|(name, values)| {
                    values.iter().map(|value| (name.clone(), value.to_owned()))
                })
                .collect(),
        })
    }
}

impl fmt::Debug for UploadTarget {
    // The query string carries the signature.
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTarget")
            .field("host", &self.url.host_str())
            .field("path", &self.url.path())
            .field("headers", &self.headers)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTargets {
    pub content: UploadTarget,
    pub metadata: UploadTarget,
}

impl TryFrom<UploadResponse> for UploadTargets {
    type Error = ApiError;

    #[inline]
    fn try_from(response: UploadResponse) -> Result<Self, Self::Error> {
        let content = UploadTarget::new(&response.put_url, &response.headers).map_err(|source| {
            ApiError::InvalidTarget {
                part: UploadPart::Content,
                source,
            }
        })?;
        let metadata =
            UploadTarget::new(&response.meta_put_url, &response.meta_headers).map_err(|source| {
                ApiError::InvalidTarget {
                    part: UploadPart::Metadata,
                    source,
                }
            })?;
        Ok(Self { content, metadata })
    }
}

impl Storage for Client {
    #[instrument(skip_all, fields(host = target.url.host_str(), size = body.len()))]
    #[inline]
    async fn put(&self, target: &UploadTarget, body: Vec<u8>) -> Result<(), TransportError> {
        let size = u64::try_from(body.len()).unwrap_or(u64::MAX);
        let mut request = self
            .reqwest
            .put(target.url.clone())
            .timeout(upload_timeout(size));
        for (name, value) in &target.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status });
        }
        debug!("upload complete");
        Ok(())
    }

    #[instrument(skip_all, fields(host = url.host_str()))]
    #[inline]
    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let response = self
            .reqwest
            .get(url.clone())
            .timeout(RESPONSE_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
