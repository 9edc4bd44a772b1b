use {
    crate::{
        cli::ConfigOverrides,
        store::{FileConfigStore, default_path},
    },
    anyhow::{Context as _, Result},
    secretshare_sdk::config::Config,
    std::path::Path,
};

#[inline]
pub fn open_store(path: Option<&Path>) -> Result<FileConfigStore> {
    let path = match path {
        Some(path) => path.to_owned(),
        None => default_path()?,
    };
    FileConfigStore::open(&path)
        .with_context(|| format!("failed to open config store {}", path.display()))
}

/// The saved configuration with command line options applied on top.
#[inline]
pub fn effective_config(store: &FileConfigStore, overrides: &ConfigOverrides) -> Result<Config> {
    let saved = Config::load(store)
        .with_context(|| format!("failed to load config from {}", store.path().display()))?;
    Ok(saved.unwrap_or_default().overlay(overrides.to_config()))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test")]
mod tests {
    use {
        super::*,
        secretshare_sdk::config::{CONFIG_STORE_KEY, ConfigStore},
    };

    #[test]
    fn overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(Some(&dir.path().join("store.json"))).unwrap();
        assert_eq!(
            effective_config(&store, &ConfigOverrides::default()).unwrap(),
            Config::default()
        );

        store
            .set(
                CONFIG_STORE_KEY,
                r#"{"endpointBaseUrl":"https://a.example.com","bucket":"saved","authKey":"k"}"#,
                None,
            )
            .unwrap();
        let overrides = ConfigOverrides {
            bucket: Some("override".into()),
            bucket_region: Some("eu-west-1".into()),
            ..ConfigOverrides::default()
        };
        let config = effective_config(&store, &overrides).unwrap();
        assert_eq!(
            config.endpoint_base_url.as_deref(),
            Some("https://a.example.com")
        );
        assert_eq!(config.bucket.as_deref(), Some("override"));
        assert_eq!(config.bucket_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.auth_key.as_deref(), Some("k"));
    }

    #[test]
    fn malformed_saved_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(Some(&dir.path().join("store.json"))).unwrap();
        store.set(CONFIG_STORE_KEY, "[1, 2]", None).unwrap();
        effective_config(&store, &ConfigOverrides::default()).unwrap_err();
    }
}
