use std::path::PathBuf;

use clap::{Parser, Subcommand};

use npi_lookup::ResolverConfig;
use npi_lookup::constants::DEFAULT_MIRROR_DB;

#[derive(Parser, Debug)]
#[command(name = "npi-lookup")]
#[command(about = "Resolve provider identity and DME enrollment (NPPES + PECOS, local mirror fallback)", long_about = None)]
pub struct Args {
    /// SQLite mirror of the NPPES and PECOS exports.
    #[arg(long, global = true, default_value = DEFAULT_MIRROR_DB)]
    pub mirror_db: PathBuf,

    /// JSON resolver config. Flags given on the command line override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// NPPES API base URL.
    ///
    /// https://npiregistry.cms.hhs.gov/api-page
    #[arg(long, global = true)]
    pub identity_api_url: Option<String>,

    /// NPPES API version query parameter.
    #[arg(long, global = true)]
    pub identity_api_version: Option<String>,

    /// PECOS order-and-referring dataset URL.
    #[arg(long, global = true)]
    pub enrollment_api_url: Option<String>,

    /// Per-request timeout in seconds; a timeout counts as the registry being down.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Attempts per registry call for transient failures.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Max candidates resolved concurrently.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a single 10-digit NPI.
    Npi {
        number: String,
    },
    /// Find providers listing a 10-digit phone number (mirror search).
    Phone {
        number: String,
    },
    /// Search providers by name, e.g. "SMITH" or "JOHN SMITH".
    Name(NameArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct NameArgs {
    /// Full name; the last word is the last name.
    pub name: String,

    /// Two-letter state filter.
    #[arg(long)]
    pub state: Option<String>,
}

impl Args {
    pub fn resolver_config(&self) -> anyhow::Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::from_json_file(path)?,
            None => ResolverConfig::default(),
        };
        if let Some(url) = &self.identity_api_url {
            config.identity_api_url = url.clone();
        }
        if let Some(version) = &self.identity_api_version {
            config.identity_api_version = version.clone();
        }
        if let Some(url) = &self.enrollment_api_url {
            config.enrollment_api_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        Ok(config)
    }
}
