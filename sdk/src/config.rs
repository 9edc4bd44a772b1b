//! Sender configuration: where the secretshare server and the bucket live,
//! and the key that lets this sender upload.
//!
//! A [`Config`] is plain data that may be partially filled. It is only
//! trusted after [`Config::validate`] turns it into a [`ValidConfig`], and it
//! only reaches a [`ConfigStore`] through [`configure`], which checks it
//! against the server first. A failed check leaves the store untouched.

use {
    crate::{
        client::Backend,
        error::{ApiError, ConfigError, MissingFields, StoreError},
    },
    chrono::{DateTime, TimeDelta, Utc},
    derivative::Derivative,
    secretshare_protocol::{credentials::AuthKey, endpoints::Ping, util::clean_url},
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, str::FromStr, time::Duration},
    tracing::{info, warn},
};

/// Name under which the configuration is kept in a [`ConfigStore`].
pub const CONFIG_STORE_KEY: &str = "secretshareConfig";

/// How long a stored configuration stays valid.
pub const CONFIG_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

const ENDPOINT_FIELD: &str = "endpointBaseUrl";
const BUCKET_FIELD: &str = "bucket";
const BUCKET_REGION_FIELD: &str = "bucketRegion";
const AUTH_KEY_FIELD: &str = "authKey";

#[derive(Derivative, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Debug)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[derivative(Debug = "ignore")]
    pub auth_key: Option<String>,
}

/// A [`Config`] with every field present and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidConfig {
    /// Without trailing slashes.
    pub endpoint: String,
    pub bucket: String,
    pub bucket_region: String,
    pub auth_key: AuthKey,
}

/// The part of the configuration a receiver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub bucket: String,
    pub bucket_region: String,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl Config {
    /// Checks that every required value is present. Blank values count as missing.
    #[inline]
    pub fn validate(&self) -> Result<ValidConfig, MissingFields> {
        let endpoint = present(self.endpoint_base_url.as_ref());
        let bucket = present(self.bucket.as_ref());
        let bucket_region = present(self.bucket_region.as_ref());
        let auth_key = present(self.auth_key.as_ref()).and_then(|key| AuthKey::from_str(key).ok());

        if let (Some(endpoint), Some(bucket), Some(bucket_region), Some(auth_key)) =
            (endpoint, bucket, bucket_region, auth_key.clone())
        {
            if endpoint.starts_with("http://") {
                warn!("secretshare endpoint is not using HTTPS");
            }
            return Ok(ValidConfig {
                endpoint: clean_url(endpoint).to_owned(),
                bucket: bucket.to_owned(),
                bucket_region: bucket_region.to_owned(),
                auth_key,
            });
        }

        let fields = [
            (ENDPOINT_FIELD, endpoint.is_none()),
            (BUCKET_FIELD, bucket.is_none()),
            (BUCKET_REGION_FIELD, bucket_region.is_none()),
            (AUTH_KEY_FIELD, auth_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();
        Err(MissingFields { fields })
    }

    /// Checks only what downloading a shared file needs.
    #[inline]
    pub fn storage_location(&self) -> Result<StorageLocation, MissingFields> {
        let bucket = present(self.bucket.as_ref());
        let bucket_region = present(self.bucket_region.as_ref());
        match (bucket, bucket_region) {
            (Some(bucket), Some(bucket_region)) => Ok(StorageLocation {
                bucket: bucket.to_owned(),
                bucket_region: bucket_region.to_owned(),
            }),
            _ => Err(MissingFields {
                fields: [
                    (BUCKET_FIELD, bucket.is_none()),
                    (BUCKET_REGION_FIELD, bucket_region.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect(),
            }),
        }
    }

    /// Returns `self` with every value that `overrides` sets replaced.
    #[must_use]
    #[inline]
    pub fn overlay(self, overrides: Self) -> Self {
        Self {
            endpoint_base_url: overrides.endpoint_base_url.or(self.endpoint_base_url),
            bucket: overrides.bucket.or(self.bucket),
            bucket_region: overrides.bucket_region.or(self.bucket_region),
            auth_key: overrides.auth_key.or(self.auth_key),
        }
    }

    /// Parses a pasted configuration command such as
    /// `secretshare config --endpoint https://... --bucket b --bucket-region r --auth-key k`.
    ///
    /// Words that are not options are skipped, so the leading program and
    /// subcommand names may be included or left out. `--option=value` is
    /// accepted as well.
    #[inline]
    pub fn parse_command(command: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut words = shell_words::split(command)?.into_iter();
        while let Some(word) = words.next() {
            let (option, inline_value) = match word.split_once('=') {
                Some((option, value)) if option.starts_with("--") => {
                    (option.to_owned(), Some(value.to_owned()))
                }
                _ => (word, None),
            };
            let slot = match option.as_str() {
                "--endpoint" => &mut config.endpoint_base_url,
                "--bucket" => &mut config.bucket,
                "--bucket-region" => &mut config.bucket_region,
                "--auth-key" => &mut config.auth_key,
                _ => continue,
            };
            let value = match inline_value {
                Some(value) => value,
                None => words
                    .next()
                    .filter(|value| !value.starts_with("--"))
                    .ok_or_else(|| ConfigError::MissingValue(option.clone()))?,
            };
            *slot = Some(value);
        }
        Ok(config)
    }

    /// Reads the configuration saved by [`configure`], if any.
    #[inline]
    pub fn load(store: &impl ConfigStore) -> Result<Option<Self>, ConfigError> {
        store
            .get(CONFIG_STORE_KEY)?
            .map(|json| serde_json::from_str(&json).map_err(ConfigError::Malformed))
            .transpose()
    }
}

/// Validates `config` and asks the server whether it accepts it.
#[inline]
pub async fn check_config<B: Backend>(
    backend: &B,
    config: &Config,
) -> Result<ValidConfig, ConfigError> {
    let config = config.validate()?;
    let request = Ping {
        secret_key: config.auth_key.clone(),
    };
    let response = backend
        .ping(&config.endpoint, &request)
        .await
        .map_err(ConfigError::Rejected)?;
    if !response.pong {
        return Err(ConfigError::Rejected(ApiError::NotPong));
    }
    Ok(config)
}

/// Checks `candidate` and, only if it passes, saves it as the configuration.
#[inline]
pub async fn configure<B: Backend, S: ConfigStore>(
    store: &mut S,
    backend: &B,
    candidate: &Config,
) -> Result<ValidConfig, ConfigError> {
    let valid = check_config(backend, candidate).await?;
    let json = serde_json::to_string(candidate).map_err(StoreError::from)?;
    store.set(CONFIG_STORE_KEY, &json, Some(CONFIG_TTL))?;
    info!(endpoint = %valid.endpoint, bucket = %valid.bucket, "configuration saved");
    Ok(valid)
}

/// Named string values with optional expiry, in the spirit of browser cookies.
pub trait ConfigStore {
    /// Returns `None` for absent and expired entries.
    fn get(&self, name: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, name: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;
    /// Returns whether an entry was removed.
    fn remove(&mut self, name: &str) -> Result<bool, StoreError>;
    /// Names of all unexpired entries, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// A stored value and its expiry time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoreEntry {
    #[inline]
    pub fn new(value: &str, ttl: Option<Duration>, now: DateTime<Utc>) -> Result<Self, StoreError> {
        let expires_at = ttl
            .map(|ttl| {
                TimeDelta::from_std(ttl)
                    .ok()
                    .and_then(|delta| now.checked_add_signed(delta))
                    .ok_or(StoreError::TtlOutOfRange(ttl))
            })
            .transpose()?;
        Ok(Self {
            value: value.to_owned(),
            expires_at,
        })
    }

    #[must_use]
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Keeps entries for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    entries: BTreeMap<String, StoreEntry>,
}

impl ConfigStore for MemoryConfigStore {
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
        Ok(())
    }

    #[inline]
    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(name).is_some())
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
