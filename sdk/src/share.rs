use {
    crate::{
        client::{Backend, Storage, UploadTargets},
        config::{Config, ValidConfig},
        crypto::{Cipher, derive_id, generate_key_with_rng},
        error::{ShareError, UploadPart},
    },
    derivative::Derivative,
    derive_more::Display,
    rand::{TryRngCore, rngs::OsRng},
    secretshare_protocol::{FileMetadata, ObjectId, endpoints::Upload},
    std::{path::Path, time::Duration},
    tracing::{debug, info, instrument},
};

/// Command the receiver runs, followed by the key.
pub const RECEIVE_COMMAND: &str = "secretshare receive";

/// Progress of a share operation. States are only ever entered in this order;
/// `Failed` may replace any state before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareState {
    Idle,
    KeyGenerated,
    IdDerived,
    TargetsRequested,
    ContentUploaded,
    MetadataUploaded,
    Done,
    Failed(FailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FailureKind {
    ConfigIncomplete,
    FileUnreadable,
    CryptoFailure,
    ServerRejected,
    TransportFailure,
}

/// Outcome of a successful share.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct ShareReceipt {
    #[derivative(Debug = "ignore")]
    human_key: String,
    object_id: ObjectId,
}

impl ShareReceipt {
    /// The line to hand to the receiver: `secretshare receive <key>`.
    #[must_use]
    #[inline]
    pub fn receive_command(&self) -> String {
        format!("{RECEIVE_COMMAND} {}", self.human_key)
    }

    #[must_use]
    #[inline]
    pub fn human_key_unmasked(&self) -> &str {
        &self.human_key
    }

    #[must_use]
    #[inline]
    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }
}

/// Drives one share at a time: key generation, id derivation, upload target
/// request, content upload and metadata upload, strictly in that order.
///
/// Metadata is only uploaded after the content upload succeeded, so a
/// receiver that finds the metadata can also find the content.
#[derive(Debug)]
pub struct UploadOrchestrator<B, S, R = OsRng> {
    backend: B,
    storage: S,
    rng: R,
    ttl: Option<Duration>,
    state: ShareState,
}

impl<B: Backend, S: Storage> UploadOrchestrator<B, S> {
    #[must_use]
    #[inline]
    pub fn new(backend: B, storage: S) -> Self {
        Self::with_rng(backend, storage, OsRng)
    }
}

impl<B: Backend, S: Storage, R: TryRngCore> UploadOrchestrator<B, S, R> {
    /// Uses `rng` for keys and IVs instead of the operating system.
    #[must_use]
    #[inline]
    pub fn with_rng(backend: B, storage: S, rng: R) -> Self {
        Self {
            backend,
            storage,
            rng,
            ttl: None,
            state: ShareState::Idle,
        }
    }

    /// Asks the storage layer to expire uploaded objects after `ttl`,
    /// rounded up to whole minutes.
    #[must_use]
    #[inline]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    #[inline]
    pub fn state(&self) -> ShareState {
        self.state
    }

    /// Reads the file at `path` and shares it under its base name.
    #[inline]
    pub async fn share_file(
        &mut self,
        config: &Config,
        path: &Path,
    ) -> Result<ShareReceipt, ShareError> {
        self.state = ShareState::Idle;
        if let Err(err) = config.validate() {
            return Err(self.fail(err.into()));
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let contents = match fs_err::tokio::read(path).await {
            Ok(contents) => contents,
            Err(err) => return Err(self.fail(ShareError::FileUnreadable(err))),
        };
        self.share(config, &file_name, &contents).await
    }

    /// Encrypts and uploads `contents`, to be saved as `file_name` by the receiver.
    #[inline]
    pub async fn share(
        &mut self,
        config: &Config,
        file_name: &str,
        contents: &[u8],
    ) -> Result<ShareReceipt, ShareError> {
        self.state = ShareState::Idle;
        match self.run(config, file_name, contents).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: ShareError) -> ShareError {
        debug!(reached = ?self.state, "share failed");
        self.state = ShareState::Failed(err.kind());
        err
    }

    fn advance(&mut self, state: ShareState) {
        debug!(from = ?self.state, to = ?state, "share progress");
        self.state = state;
    }

    #[instrument(skip_all, fields(file_name = %file_name, size = contents.len()))]
    async fn run(
        &mut self,
        config: &Config,
        file_name: &str,
        contents: &[u8],
    ) -> Result<ShareReceipt, ShareError> {
        let config = config.validate()?;

        let (key, human_key) =
            generate_key_with_rng(&mut self.rng).map_err(|source| ShareError::CryptoFailure {
                reached: self.state,
                source,
            })?;
        self.advance(ShareState::KeyGenerated);

        let object_id = derive_id(&key);
        self.advance(ShareState::IdDerived);

        let targets = self.request_targets(&config, &object_id).await?;
        self.advance(ShareState::TargetsRequested);

        let cipher = Cipher::new(&key);
        drop(key);
        let content = cipher
            .encode(contents, &mut self.rng)
            .map_err(|source| ShareError::CryptoFailure {
                reached: self.state,
                source,
            })?;
        self.storage
            .put(&targets.content, content)
            .await
            .map_err(|source| ShareError::TransportFailure {
                part: UploadPart::Content,
                source,
            })?;
        self.advance(ShareState::ContentUploaded);

        let metadata = FileMetadata {
            filename: file_name.to_owned(),
            filesize: u64::try_from(contents.len()).unwrap_or(u64::MAX),
        };
        let metadata = cipher
            .encode(&serde_json::to_vec(&metadata)?, &mut self.rng)
            .map_err(|source| ShareError::CryptoFailure {
                reached: self.state,
                source,
            })?;
        self.storage
            .put(&targets.metadata, metadata)
            .await
            .map_err(|source| ShareError::TransportFailure {
                part: UploadPart::Metadata,
                source,
            })?;
        self.advance(ShareState::MetadataUploaded);

        info!(%object_id, "file shared");
        let receipt = ShareReceipt {
            human_key,
            object_id,
        };
        self.advance(ShareState::Done);
        Ok(receipt)
    }

    async fn request_targets(
        &self,
        config: &ValidConfig,
        object_id: &ObjectId,
    ) -> Result<UploadTargets, ShareError> {
        let request = Upload {
            secret_key: config.auth_key.clone(),
            object_id: object_id.clone(),
            ttl: self.ttl.map(|ttl| ttl.as_secs().div_ceil(60)),
        };
        let response = self
            .backend
            .request_upload(&config.endpoint, &request)
            .await
            .map_err(ShareError::ServerRejected)?;
        UploadTargets::try_from(response).map_err(ShareError::ServerRejected)
    }
}
