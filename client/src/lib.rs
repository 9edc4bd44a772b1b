pub mod cli;
pub mod config;
pub mod store;

use {
    crate::{
        cli::{Cli, Command, ConfigOverrides},
        config::{effective_config, open_store},
    },
    anyhow::{Context as _, Result},
    secretshare_protocol::{endpoints::API_VERSION, util::clean_url},
    secretshare_sdk::{
        client::Client,
        config::{CONFIG_STORE_KEY, Config, ConfigStore, check_config, configure},
        crypto::{derive_id, generate_key},
        receive::{ReceiveOptions, receive},
        share::UploadOrchestrator,
    },
    std::{io, path::Path},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, prelude::*},
};

/// Logs to stderr. `RUST_LOG` takes precedence over `log_filter`.
#[inline]
pub fn setup_logger(log_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_env| EnvFilter::try_new(log_filter))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}

#[inline]
pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config_store,
        overrides,
        command,
        ..
    } = cli;
    let store_path = config_store.as_deref();
    match command {
        Command::Send { file, ttl } => {
            let config = effective_config(&open_store(store_path)?, &overrides)?;
            let client = Client::new()?;
            let receipt = UploadOrchestrator::new(&client, &client)
                .with_ttl(ttl)
                .share_file(&config, &file)
                .await?;
            info!(id = %receipt.object_id(), "file shared; run this to receive it:");
            println!("{}", receipt.receive_command());
        }
        Command::Receive {
            key,
            dest,
            name,
            overwrite,
        } => {
            let config = effective_config(&open_store(store_path)?, &overrides)?;
            let location = config.storage_location()?;
            let options = ReceiveOptions {
                destination: dest,
                rename: name,
                overwrite,
            };
            let received = receive(&Client::new()?, &location, &key, &options).await?;
            println!("{}", received.path.display());
        }
        Command::Config { from } => save_config(store_path, &overrides, from.as_deref()).await?,
        Command::ShowConfig => show_config(store_path)?,
        Command::ClearConfig => {
            if open_store(store_path)?.remove(CONFIG_STORE_KEY)? {
                info!("saved configuration removed");
            } else {
                info!("no saved configuration");
            }
        }
        Command::Ping => {
            let config = effective_config(&open_store(store_path)?, &overrides)?;
            let valid = check_config(&Client::new()?, &config).await?;
            info!(endpoint = %valid.endpoint, "server accepted the configuration");
        }
        Command::Version => {
            let config = effective_config(&open_store(store_path)?, &overrides)?;
            println!("client {} (API {API_VERSION})", env!("CARGO_PKG_VERSION"));
            let endpoint = config
                .endpoint_base_url
                .as_deref()
                .map(str::trim)
                .filter(|endpoint| !endpoint.is_empty())
                .context("no secretshare endpoint configured")?;
            let version = Client::new()?.server_version(&clean_url(endpoint)).await?;
            println!(
                "server {} (API {})",
                version.server_version, version.api_version
            );
            if version.api_version != API_VERSION {
                warn!(
                    server = version.api_version,
                    client = API_VERSION,
                    "API version mismatch; shares may not be readable by the other side"
                );
            }
        }
        Command::GenerateKey => {
            let (key, human_key) = generate_key()?;
            println!("key: {human_key}");
            println!("id:  {}", derive_id(&key));
        }
    }
    Ok(())
}

/// Saved values are the base, then the pasted command, then explicit options.
async fn save_config(
    store_path: Option<&Path>,
    overrides: &ConfigOverrides,
    from: Option<&str>,
) -> Result<()> {
    let mut store = open_store(store_path)?;
    let mut candidate = Config::load(&store)?.unwrap_or_default();
    if let Some(command) = from {
        candidate = candidate.overlay(Config::parse_command(command)?);
    }
    candidate = candidate.overlay(overrides.to_config());
    if candidate
        .auth_key
        .as_deref()
        .is_none_or(|key| key.trim().is_empty())
    {
        let key = rpassword::prompt_password("Auth key: ")
            .context("auth key is not set and cannot be prompted for")?;
        candidate.auth_key = Some(key);
    }
    configure(&mut store, &Client::new()?, &candidate).await?;
    Ok(())
}

fn show_config(store_path: Option<&Path>) -> Result<()> {
    let store = open_store(store_path)?;
    let Some(config) = Config::load(&store)? else {
        warn!(path = %store.path().display(), "no saved configuration");
        return Ok(());
    };
    let unset = || "(not set)".to_owned();
    println!(
        "endpointBaseUrl: {}",
        config.endpoint_base_url.unwrap_or_else(unset)
    );
    println!("bucket:          {}", config.bucket.unwrap_or_else(unset));
    println!(
        "bucketRegion:    {}",
        config.bucket_region.unwrap_or_else(unset)
    );
    let auth_key = if config.auth_key.is_some() {
        "(hidden)"
    } else {
        "(not set)"
    };
    println!("authKey:         {auth_key}");
    Ok(())
}
