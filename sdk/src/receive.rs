use {
    crate::{
        client::Storage,
        config::StorageLocation,
        crypto::{Cipher, derive_id},
        error::{ReceiveError, TransportError, UploadPart},
    },
    secretshare_protocol::{
        FileMetadata,
        credentials::EncryptionKey,
        util::{metadata_url, object_url},
    },
    std::{
        io::{ErrorKind, Write},
        path::{Component, Path, PathBuf},
    },
    tempfile::NamedTempFile,
    tracing::{info, instrument},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Directory the file is written into.
    pub destination: PathBuf,
    /// Name to save as instead of the sender's file name.
    pub rename: Option<String>,
    pub overwrite: bool,
}

impl Default for ReceiveOptions {
    #[inline]
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            rename: None,
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

/// Returns `name` if it names a file directly inside the destination directory.
fn safe_file_name(name: &str) -> Result<&str, ReceiveError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(name),
        _ => Err(ReceiveError::UnsafeFileName(name.to_owned())),
    }
}

/// Downloads, decrypts and saves the file shared under `key`.
///
/// Nothing is written unless the content decrypts and matches the size
/// recorded in the metadata. The file is created with owner-only permissions
/// and moved into place in one step.
#[instrument(skip_all, fields(destination = %options.destination.display()))]
#[inline]
pub async fn receive<S: Storage>(
    storage: &S,
    location: &StorageLocation,
    key: &EncryptionKey,
    options: &ReceiveOptions,
) -> Result<ReceivedFile, ReceiveError> {
    let object_id = derive_id(key);
    let cipher = Cipher::new(key);
    let url = metadata_url(&location.bucket_region, &location.bucket, &object_id)
        .map_err(|err| ReceiveError::MetadataDownloadFailed(TransportError::from(err)))?;
    let metadata = storage
        .get(&url)
        .await
        .map_err(ReceiveError::MetadataDownloadFailed)?;
    let metadata = cipher
        .decode(&metadata)
        .map_err(|source| ReceiveError::DecryptionFailed {
            part: UploadPart::Metadata,
            source,
        })?;
    let metadata: FileMetadata =
        serde_json::from_slice(&metadata).map_err(ReceiveError::MalformedMetadata)?;

    let name = safe_file_name(options.rename.as_deref().unwrap_or(&metadata.filename))?;
    let path = options.destination.join(name);
    if !options.overwrite && path.exists() {
        return Err(ReceiveError::FileExists(path));
    }

    let url = object_url(&location.bucket_region, &location.bucket, &object_id)
        .map_err(|err| ReceiveError::DataDownloadFailed(TransportError::from(err)))?;
    let data = storage
        .get(&url)
        .await
        .map_err(ReceiveError::DataDownloadFailed)?;
    let data = cipher
        .decode(&data)
        .map_err(|source| ReceiveError::DecryptionFailed {
            part: UploadPart::Content,
            source,
        })?;
    let actual = u64::try_from(data.len()).unwrap_or(u64::MAX);
    if actual != metadata.filesize {
        return Err(ReceiveError::SizeMismatch {
            expected: metadata.filesize,
            actual,
        });
    }

    write_file(&options.destination, &path, &data, options.overwrite)?;
    info!(path = %path.display(), size = actual, "file received");
    Ok(ReceivedFile { path, metadata })
}

fn write_file(
    destination: &Path,
    path: &Path,
    data: &[u8],
    overwrite: bool,
) -> Result<(), ReceiveError> {
    let create_failed = |source| ReceiveError::CreateFailed {
        path: path.to_owned(),
        source,
    };
    let mut file = NamedTempFile::new_in(destination).map_err(create_failed)?;
    file.write_all(data).map_err(create_failed)?;
    file.as_file().sync_all().map_err(create_failed)?;
    let persisted = if overwrite {
        file.persist(path)
    } else {
        file.persist_noclobber(path)
    };
    match persisted {
        Ok(_) => Ok(()),
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
            Err(ReceiveError::FileExists(path.to_owned()))
        }
        Err(err) => Err(create_failed(err.error)),
    }
}
