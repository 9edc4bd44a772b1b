use {
    anyhow::{Context as _, Result},
    chrono::Utc,
    fs_err as fs,
    secretshare_sdk::{
        config::{ConfigStore, StoreEntry},
        error::StoreError,
    },
    std::{
        collections::BTreeMap,
        io::{self, Write as _},
        path::{Path, PathBuf},
        time::Duration,
    },
    tempfile::NamedTempFile,
};

/// Config store kept in a JSON file, rewritten on every change.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    entries: BTreeMap<String, StoreEntry>,
}

#[inline]
pub fn default_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("cannot find config dir")?;
    Ok(dir.join("secretshare").join("store.json"))
}

impl FileConfigStore {
    /// Opens the store at `path`. A missing file is an empty store.
    #[inline]
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, entries })
    }

    #[must_use]
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let now = Utc::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        // Temp files are created with mode 0600.
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, &self.entries)?;
        file.flush()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    #[inline]
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .get(name)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    #[inline]
    fn set(&mut self, name: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = StoreEntry::new(value, ttl, Utc::now())?;
        self.entries.insert(name.to_owned(), entry);
        self.save()
    }

    #[inline]
    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        let removed = self.entries.remove(name).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    #[inline]
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(name, _)| name.clone())
            .collect())
    }
}
