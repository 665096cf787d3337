//! # PWSTORE CLI
//!
//! Command-line interface for the password store.
//!
//! ## Usage
//!
//! ```bash
//! # Show the password fields of every schema type
//! pwstore --schema schemas.yaml fields
//!
//! # Move the passwords of a payload into Kubernetes secrets and print the result
//! pwstore --schema schemas.yaml redact githubConfig gh1.json
//!
//! # Resolve the references of a stored payload back to plaintext
//! pwstore --schema schemas.yaml resolve githubConfig gh1-stored.json
//!
//! # Delete one secret entry
//! pwstore delete-secret proj1 gh1-clientsecret
//!
//! # Build information
//! pwstore version
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use password_store::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

mod delete_secret;
mod fields;
mod redact;
mod resolve;

/// Password store CLI
#[derive(Parser)]
#[command(name = "pwstore")]
#[command(
    about = "Move password fields of resource payloads into Kubernetes secrets",
    long_about = None,
    after_help = "\
Payload files hold a single JSON object. Use '-' to read from stdin.

Examples:
  pwstore --schema schemas.yaml fields
  pwstore --schema schemas.yaml redact githubConfig gh1.json
  pwstore delete-secret proj1 gh1-clientsecret
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Schema registry file (YAML or JSON map of type name to fields)
    #[arg(short, long, global = true, env = "PASSWORD_STORE_SCHEMA")]
    schema: Option<PathBuf>,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the password field tree of each protected resource type
    Fields {
        /// Only this resource type
        #[arg(value_name = "RESOURCE_TYPE")]
        resource_type: Option<String>,
    },
    /// Move password fields of a payload into secrets and print the redacted payload
    Redact {
        #[arg(value_name = "RESOURCE_TYPE")]
        resource_type: String,

        /// Payload file, or '-' for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Resolve secret references in a payload and print the plaintext payload
    Resolve {
        #[arg(value_name = "RESOURCE_TYPE")]
        resource_type: String,

        /// Payload file, or '-' for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete a secret entry (missing entries are not an error)
    DeleteSecret {
        #[arg(value_name = "NAMESPACE")]
        namespace: String,

        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Print build information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any other operations
    // We use ring as the crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    let config = StoreConfig::from_env();
    init_tracing(&config)?;
    if config.enable_metrics {
        register_metrics().context("Failed to register metrics")?;
    }

    let cli = Cli::parse();
    debug!("Loaded configuration: {:?}", config);

    let result = match cli.command {
        Commands::Fields { resource_type } => {
            let registry = load_registry(cli.schema.as_deref())?;
            fields::fields_command(&config, &registry, resource_type.as_deref())
        }
        Commands::Redact {
            resource_type,
            file,
        } => {
            let store = connect(&config, cli.schema.as_deref()).await?;
            redact::redact_command(&store, &resource_type, &file).await
        }
        Commands::Resolve {
            resource_type,
            file,
        } => {
            let store = connect(&config, cli.schema.as_deref()).await?;
            resolve::resolve_command(&store, &resource_type, &file).await
        }
        Commands::DeleteSecret { namespace, name } => {
            let secrets = secret_manager().await?;
            delete_secret::delete_secret_command(&secrets, &namespace, &name).await
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    };

    if cli.print_metrics && config.enable_metrics {
        eprintln!("{}", gather_metrics()?);
    }

    result
}

fn print_version() {
    println!("pwstore {}", env!("CARGO_PKG_VERSION"));
    println!("  Git hash:   {}", env!("BUILD_GIT_HASH"));
    println!("  Built at:   {}", env!("BUILD_DATETIME"));
    println!("  Timestamp:  {}", env!("BUILD_TIMESTAMP"));
}

fn load_registry(path: Option<&Path>) -> Result<MemorySchemaRegistry> {
    let path = path.context(
        "A schema registry file is required. Pass --schema or set PASSWORD_STORE_SCHEMA.",
    )?;
    MemorySchemaRegistry::from_file(path)
}

/// Field index over the configured protected types, or every schema type
fn field_index(config: &StoreConfig, registry: &MemorySchemaRegistry) -> Result<FieldIndex> {
    let index = if config.protected_types.is_empty() {
        FieldIndex::build_all(registry)
    } else {
        FieldIndex::build(registry, &config.protected_types)
    };
    index.context("Failed to build password field index")
}

async fn secret_manager() -> Result<SecretManager> {
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;
    Ok(SecretManager::new(
        Arc::new(KubeSecretBackend::new(client.clone())),
        Arc::new(KubeNamespaceBackend::new(client)),
    ))
}

async fn connect(config: &StoreConfig, schema: Option<&Path>) -> Result<PasswordStore> {
    let registry = load_registry(schema)?;
    let fields = field_index(config, &registry)?;
    let secrets = secret_manager().await?;
    Ok(PasswordStore::from_config(config, Arc::new(fields), secrets))
}

/// Read a JSON object from `path`, or stdin when `path` is `-`
pub(crate) fn read_payload(path: &Path) -> Result<Payload> {
    let content = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read payload from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file {}", path.display()))?
    };
    serde_json::from_str(&content)
        .with_context(|| format!("Payload in {} is not a JSON object", path.display()))
}

pub(crate) fn print_payload(payload: &Payload) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).context("Failed to serialize payload")?
    );
    Ok(())
}
