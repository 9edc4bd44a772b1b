#![expect(clippy::unwrap_used, reason = "test")]

use {
    crate::{
        client::{Backend, Storage, UploadTarget},
        config::Config,
        error::{ApiError, RequestId, TransportError, UploadPart},
    },
    rand::{RngCore, TryRngCore},
    reqwest::{StatusCode, Url},
    secretshare_protocol::{
        endpoints::{HeaderValues, Ping, PingResponse, Upload, UploadResponse},
        util::{metadata_url, object_url},
    },
    std::{collections::BTreeMap, sync::Mutex},
};

/// Produces only zero bytes.
pub(crate) struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(0);
    }
}

/// Reports the random source as unavailable.
pub(crate) struct BrokenRng;

impl TryRngCore for BrokenRng {
    type Error = &'static str;

    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        Err("entropy pool closed")
    }

    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        Err("entropy pool closed")
    }

    fn try_fill_bytes(&mut self, _dst: &mut [u8]) -> Result<(), Self::Error> {
        Err("entropy pool closed")
    }
}

pub(crate) fn full_config() -> Config {
    Config {
        endpoint_base_url: Some("https://api.example.com".into()),
        bucket: Some("shares".into()),
        bucket_region: Some("us-west-2".into()),
        auth_key: Some("letmein".into()),
    }
}

/// Hands out upload targets that point at the public download URLs, so a
/// [`FakeStorage`] can serve back whatever was uploaded.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    pub pong: bool,
    pub reject: bool,
    pub bucket: String,
    pub bucket_region: String,
    pub ping_keys: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<Upload>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            pong: true,
            reject: false,
            bucket: "shares".into(),
            bucket_region: "us-west-2".into(),
            ping_keys: Mutex::default(),
            uploads: Mutex::default(),
        }
    }
}

impl FakeBackend {
    pub(crate) fn pings(&self) -> Vec<String> {
        self.ping_keys.lock().unwrap().clone()
    }

    pub(crate) fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Backend for FakeBackend {
    async fn ping(&self, _endpoint: &str, request: &Ping) -> Result<PingResponse, ApiError> {
        self.ping_keys
            .lock()
            .unwrap()
            .push(request.secret_key.as_unmasked_str().to_owned());
        if self.reject {
            return Err(ApiError::Unauthorized {
                req_id: RequestId::default(),
            });
        }
        Ok(PingResponse { pong: self.pong })
    }

    async fn request_upload(
        &self,
        _endpoint: &str,
        request: &Upload,
    ) -> Result<UploadResponse, ApiError> {
        self.uploads.lock().unwrap().push(request.clone());
        if self.reject {
            return Err(ApiError::Unauthorized {
                req_id: RequestId::default(),
            });
        }
        let headers = [(
            "Content-Type".to_owned(),
            HeaderValues::One("application/octet-stream".into()),
        )];
        Ok(UploadResponse {
            id: None,
            put_url: object_url(&self.bucket_region, &self.bucket, &request.object_id)
                .unwrap()
                .into(),
            headers: headers.clone().into(),
            meta_put_url: metadata_url(&self.bucket_region, &self.bucket, &request.object_id)
                .unwrap()
                .into(),
            meta_headers: headers.into(),
        })
    }
}

/// In-memory object storage keyed by URL.
#[derive(Debug, Default)]
pub(crate) struct FakeStorage {
    pub fail_put: Option<UploadPart>,
    pub objects: Mutex<BTreeMap<Url, Vec<u8>>>,
    pub puts: Mutex<Vec<UploadTarget>>,
    pub gets: Mutex<Vec<Url>>,
}

fn part_of(url: &Url) -> UploadPart {
    if url.path().contains("/meta/") {
        UploadPart::Metadata
    } else {
        UploadPart::Content
    }
}

impl FakeStorage {
    pub(crate) fn put_parts(&self) -> Vec<UploadPart> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|target| part_of(&target.url))
            .collect()
    }

    pub(crate) fn object(&self, url: &Url) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(url).cloned()
    }

    pub(crate) fn insert(&self, url: Url, body: Vec<u8>) {
        self.objects.lock().unwrap().insert(url, body);
    }

    pub(crate) fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }
}

impl Storage for FakeStorage {
    async fn put(&self, target: &UploadTarget, body: Vec<u8>) -> Result<(), TransportError> {
        self.puts.lock().unwrap().push(target.clone());
        if self.fail_put == Some(part_of(&target.url)) {
            return Err(TransportError::Status {
                status: StatusCode::FORBIDDEN,
            });
        }
        self.insert(target.url.clone(), body);
        Ok(())
    }

    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        self.gets.lock().unwrap().push(url.clone());
        self.object(url).ok_or(TransportError::Status {
            status: StatusCode::NOT_FOUND,
        })
    }
}
