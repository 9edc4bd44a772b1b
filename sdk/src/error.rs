use {
    crate::share::{FailureKind, ShareState},
    derive_more::Display,
    reqwest::{StatusCode, header::HeaderMap},
    secretshare_protocol::endpoints::REQUEST_ID_HEADER,
    std::{fmt, io, path::PathBuf, time::Duration},
    thiserror::Error,
};

/// Which of the two objects of a share an operation was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UploadPart {
    #[display("content")]
    Content,
    #[display("metadata")]
    Metadata,
}

/// The operating system could not supply random bytes for a key or an IV.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("system randomness source is unavailable: {reason}")]
pub struct EntropyUnavailable {
    reason: String,
}

impl EntropyUnavailable {
    pub(crate) fn new(reason: impl fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("envelope is too short ({len} bytes, expected at least 17)")]
    TooShort { len: usize },
    #[error("envelope is corrupt: {0}")]
    Corrupt(&'static str),
    /// Wrong key or damaged ciphertext.
    #[error("failed to decrypt envelope")]
    DecryptionFailed,
}

/// Required configuration values that are absent or blank, by their stored names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config is missing required option(s): {}", .fields.join(", "))]
pub struct MissingFields {
    pub fields: Vec<&'static str>,
}

/// Request id reported by the secretshare server, shown in error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestId(Option<String>);

impl RequestId {
    #[must_use]
    #[inline]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(
            headers
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        )
    }
}

impl fmt::Display for RequestId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(id) => write!(f, " (request id {id})"),
            None => Ok(()),
        }
    }
}

/// Failure talking to the secretshare backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid secretshare endpoint URL")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("failed to reach secretshare server")]
    Connect(#[from] reqwest::Error),
    #[error("failed to authenticate to secretshare server{req_id}")]
    Unauthorized { req_id: RequestId },
    #[error("secretshare server encountered an internal error{req_id}")]
    Internal { req_id: RequestId },
    #[error("secretshare server responded with HTTP {status}{req_id}: {body}")]
    Status {
        status: StatusCode,
        req_id: RequestId,
        body: String,
    },
    #[error("malformed response from secretshare server: {body}")]
    Malformed {
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("secretshare server did not answer the ping")]
    NotPong,
    #[error("secretshare server returned an invalid {part} upload URL")]
    InvalidTarget {
        part: UploadPart,
        #[source]
        source: url::ParseError,
    },
}

/// Failure moving bytes to or from object storage.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid storage URL")]
    InvalidUrl(#[from] url::ParseError),
    #[error("storage request failed")]
    Request(#[from] reqwest::Error),
    #[error("storage responded with HTTP {status}")]
    Status { status: StatusCode },
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    ConfigIncomplete(#[from] MissingFields),
    #[error("cannot read the file to share")]
    FileUnreadable(#[source] io::Error),
    #[error("cryptographic failure after reaching {reached:?}")]
    CryptoFailure {
        reached: ShareState,
        #[source]
        source: EntropyUnavailable,
    },
    #[error("failed to encode file metadata")]
    MetadataEncoding(#[from] serde_json::Error),
    #[error("secretshare server refused the upload")]
    ServerRejected(#[source] ApiError),
    #[error("failed to upload {part}")]
    TransportFailure {
        part: UploadPart,
        #[source]
        source: TransportError,
    },
}

impl ShareError {
    #[must_use]
    #[inline]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConfigIncomplete(_) => FailureKind::ConfigIncomplete,
            Self::FileUnreadable(_) => FailureKind::FileUnreadable,
            Self::CryptoFailure { .. } | Self::MetadataEncoding(_) => FailureKind::CryptoFailure,
            Self::ServerRejected(_) => FailureKind::ServerRejected,
            Self::TransportFailure { .. } => FailureKind::TransportFailure,
        }
    }

    /// Last state the share operation completed before this error.
    #[must_use]
    #[inline]
    pub fn reached(&self) -> ShareState {
        match self {
            Self::ConfigIncomplete(_) | Self::FileUnreadable(_) => ShareState::Idle,
            Self::CryptoFailure { reached, .. } => *reached,
            Self::ServerRejected(_) => ShareState::IdDerived,
            Self::TransportFailure {
                part: UploadPart::Content,
                ..
            } => ShareState::TargetsRequested,
            Self::TransportFailure {
                part: UploadPart::Metadata,
                ..
            }
            | Self::MetadataEncoding(_) => ShareState::ContentUploaded,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("failed to download file metadata")]
    MetadataDownloadFailed(#[source] TransportError),
    #[error("failed to decrypt {part}; check the key")]
    DecryptionFailed {
        part: UploadPart,
        #[source]
        source: EnvelopeError,
    },
    #[error("file metadata is malformed")]
    MalformedMetadata(#[source] serde_json::Error),
    #[error("refusing to write to unsafe file name {0:?}")]
    UnsafeFileName(String),
    #[error("{} already exists; pass the overwrite option to replace it", .0.display())]
    FileExists(PathBuf),
    #[error("failed to create {}", .path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to download file data")]
    DataDownloadFailed(#[source] TransportError),
    #[error("file size mismatch; expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config store I/O failed")]
    Io(#[from] io::Error),
    #[error("config store contents are malformed")]
    Malformed(#[from] serde_json::Error),
    #[error("expiry {0:?} is out of range")]
    TtlOutOfRange(Duration),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot split config command into arguments")]
    Parse(#[from] shell_words::ParseError),
    #[error("option `{0}` requires a value")]
    MissingValue(String),
    #[error(transparent)]
    Incomplete(#[from] MissingFields),
    #[error("secretshare server rejected the configuration")]
    Rejected(#[source] ApiError),
    #[error("stored config is malformed")]
    Malformed(#[source] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
