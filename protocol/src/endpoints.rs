use {
    crate::{ObjectId, credentials::AuthKey},
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, slice},
};

/// Backend API revision implemented by this crate. A server reporting a
/// different value from [`VERSION_PATH`] speaks an incompatible protocol.
pub const API_VERSION: u32 = 2;

/// Path of the unauthenticated `GET` endpoint returning [`ServerVersionResponse`].
pub const VERSION_PATH: &str = "version";

/// Response header carrying the server's request id, for correlating errors
/// with server logs.
pub const REQUEST_ID_HEADER: &str = "Secretshare-Reqid";

pub trait RequestToResponse {
    type Response;
    const PATH: &'static str;
}
macro_rules! response_type {
    ($request:ty, $response:ty, $path:literal) => {
        impl RequestToResponse for $request {
            type Response = $response;
            const PATH: &'static str = $path;
        }
    };
}

/// Checks that the server is reachable and accepts the auth key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ping {
    pub secret_key: AuthKey,
}
response_type!(Ping, PingResponse, "ping");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub pong: bool,
}

/// Asks the server for pre-signed storage URLs for a new object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub secret_key: AuthKey,
    pub object_id: ObjectId,
    /// Minutes until the storage layer may delete the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}
response_type!(Upload, UploadResponse, "upload");

/// Two pre-signed `PUT` targets, one for the content envelope and one for the
/// metadata envelope, each with the headers the signature covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub put_url: String,
    #[serde(default)]
    pub headers: HeaderMap,
    pub meta_put_url: String,
    #[serde(default)]
    pub meta_headers: HeaderMap,
}

pub type HeaderMap = BTreeMap<String, HeaderValues>;

/// Older servers send a list of values per header, newer ones a single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values = match self {
            Self::One(value) => slice::from_ref(value),
            Self::Many(values) => values.as_slice(),
        };
        values.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersionResponse {
    pub server_version: u32,
    pub api_version: u32,
}
