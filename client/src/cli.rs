use {
    clap::{Args, Parser, Subcommand},
    secretshare_protocol::credentials::EncryptionKey,
    secretshare_sdk::config::Config,
    std::{path::PathBuf, time::Duration},
};

#[derive(Debug, Parser)]
#[command(name = "secretshare", version, about = "Share files securely", long_about = None)]
pub struct Cli {
    /// File holding the saved configuration. Defaults to a file in the
    /// user's config directory.
    #[arg(long, global = true)]
    pub config_store: Option<PathBuf>,
    /// Log filter in `RUST_LOG` syntax. `RUST_LOG` takes precedence if set.
    #[arg(long, global = true, default_value = "info")]
    pub log_filter: String,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
    #[command(subcommand)]
    pub command: Command,
}

/// Values that take precedence over the saved configuration. The `config`
/// command saves exactly these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct ConfigOverrides {
    /// Base URL of the secretshare server.
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
    /// Bucket that holds shared files.
    #[arg(long, global = true)]
    pub bucket: Option<String>,
    /// Region of the bucket, e.g. `us-west-2`.
    #[arg(long, global = true)]
    pub bucket_region: Option<String>,
    /// Key for uploading through the secretshare server.
    #[arg(long, global = true, env = "SECRETSHARE_AUTH_KEY", hide_env_values = true)]
    pub auth_key: Option<String>,
}

impl ConfigOverrides {
    #[must_use]
    #[inline]
    pub fn to_config(&self) -> Config {
        Config {
            endpoint_base_url: self.endpoint.clone(),
            bucket: self.bucket.clone(),
            bucket_region: self.bucket_region.clone(),
            auth_key: self.auth_key.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt a file, upload it, and print the command that receives it.
    Send {
        file: PathBuf,
        /// Ask the bucket to delete the file after this long, e.g. `2h` or `3days`.
        #[arg(long, value_parser = humantime::parse_duration)]
        ttl: Option<Duration>,
    },
    /// Download and decrypt a shared file.
    Receive {
        key: EncryptionKey,
        /// Directory to save the file in.
        #[arg(long, default_value = ".")]
        dest: PathBuf,
        /// Save under this name instead of the sender's file name.
        #[arg(long)]
        name: Option<String>,
        /// Replace an existing file.
        #[arg(long)]
        overwrite: bool,
    },
    /// Check and save the configuration given by the `--endpoint`, `--bucket`,
    /// `--bucket-region` and `--auth-key` options.
    Config {
        /// Read the options from a pasted configuration command instead.
        #[arg(long)]
        from: Option<String>,
    },
    /// Print the saved configuration.
    ShowConfig,
    /// Forget the saved configuration.
    ClearConfig,
    /// Check that the server is reachable and accepts the auth key.
    Ping,
    /// Print client and server versions.
    Version,
    /// Print a new random key and the object id derived from it.
    GenerateKey,
}
