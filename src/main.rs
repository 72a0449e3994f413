mod cli;

use anyhow::{Context, bail};
use clap::Parser;

use npi_lookup::normalize::NameQuery;
use npi_lookup::{MirrorStore, Query, Resolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let query = match &args.cmd {
        cli::Command::Npi { number } => Query::identifier(number),
        cli::Command::Phone { number } => Query::phone(number),
        cli::Command::Name(name) => {
            NameQuery::from_full_name(&name.name, name.state.as_deref()).map(Query::ByName)
        }
    }
    .context("rejected query")?;

    let config = args.resolver_config()?;

    let mirror = MirrorStore::open(&args.mirror_db)
        .with_context(|| format!("open mirror at {}", args.mirror_db.display()))?;
    let resolver = Resolver::from_config(config, mirror).context("Failed creating HTTP client")?;

    let aggregate = tokio::select! {
        result = resolver.resolve(&query) => result.with_context(|| format!("lookup by {query} failed"))?,
        _ = tokio::signal::ctrl_c() => bail!("Received Ctrl-C; lookup cancelled"),
    };

    let out = serde_json::to_string_pretty(&aggregate).context("serialize results")?;
    println!("{out}");
    Ok(())
}
