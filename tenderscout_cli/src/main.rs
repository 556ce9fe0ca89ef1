mod cli;
mod output;

use clap::Parser;
use std::time::Duration;
use uuid::Uuid;

use cli::{Cli, CliError, Command, SavedCommand};
use tenderscout_core::credentials::FileCredentialStore;
use tenderscout_core::saved::SavedSearchStore;
use tenderscout_core::{build_default_registry, AggregationEngine, SourceRegistry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let credentials = FileCredentialStore::new_default();
    let registry = build_default_registry(&credentials);
    tracing::debug!(sources = registry.list_all().len(), "registry built");

    match cli.command {
        Command::Search(args) => {
            let query = args.to_query()?;
            let overall = args.timeout_secs.map(Duration::from_secs);
            let result = search(&registry, &query, overall).await?;
            output::render_result(&result, cli.json)?;
        }

        Command::Sources => {
            output::render_sources(&registry, cli.json)?;
        }

        Command::Saved { command } => match command {
            SavedCommand::Save {
                name,
                notify,
                search,
            } => {
                let query = search.to_query()?;
                let store = SavedSearchStore::new_default();
                let id = store.save(&name, query, notify)?;
                println!("saved '{}' as {}", name, id);
            }

            SavedCommand::List => {
                let store = SavedSearchStore::new_default();
                output::render_saved(&store.list(), cli.json)?;
            }

            SavedCommand::Run { key, timeout_secs } => {
                let store = SavedSearchStore::new_default();
                let entry = store.find(&key).ok_or(CliError::NotFound(key))?;
                store.touch(entry.id)?;

                let overall = timeout_secs.map(Duration::from_secs);
                let result = search(&registry, &entry.query, overall).await?;
                output::render_result(&result, cli.json)?;
            }

            SavedCommand::Delete { id } => {
                let uuid =
                    Uuid::parse_str(&id).map_err(|_| CliError::InvalidId(id.clone()))?;
                let store = SavedSearchStore::new_default();
                if store.delete(uuid)? {
                    println!("deleted {}", uuid);
                } else {
                    return Err(CliError::NotFound(id));
                }
            }
        },
    }

    Ok(())
}

async fn search(
    registry: &SourceRegistry,
    query: &tenderscout_core::model::SearchQuery,
    overall: Option<Duration>,
) -> Result<tenderscout_core::AggregatedResult, CliError> {
    let engine = AggregationEngine::new(registry);
    Ok(engine.search_with_deadline(query, overall).await?)
}
