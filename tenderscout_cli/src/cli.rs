//! Command-line argument definitions.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tenderscout_core::model::{SearchQuery, TenderType};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid saved-search id '{0}'")]
    InvalidId(String),

    #[error("saved search '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Query(#[from] tenderscout_core::QueryError),

    #[error(transparent)]
    Saved(#[from] tenderscout_core::saved::SavedSearchError),

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Parser)]
#[command(
    name = "tenderscout",
    version,
    about = "Aggregated tender search across public procurement sources"
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search every enabled source and merge the results
    Search(SearchArgs),

    /// List configured sources and their status
    Sources,

    /// Manage saved searches
    Saved {
        #[command(subcommand)]
        command: SavedCommand,
    },
}

#[derive(Subcommand)]
pub enum SavedCommand {
    /// Store a search under a name for later replay
    Save {
        name: String,

        /// Flag the search for new-result notifications
        #[arg(long)]
        notify: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// List saved searches
    List,

    /// Replay a saved search by name or id
    Run {
        key: String,

        /// Overall search budget in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Delete a saved search by id
    Delete { id: String },
}

#[derive(Args, Clone)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(short, long)]
    pub query: Option<String>,

    /// CPV classification code filter (repeatable)
    #[arg(long = "cpv")]
    pub cpv_codes: Vec<String>,

    /// ISO country code filter (repeatable)
    #[arg(long = "country")]
    pub countries: Vec<String>,

    /// Minimum estimated value
    #[arg(long)]
    pub min_value: Option<f64>,

    /// Maximum estimated value
    #[arg(long)]
    pub max_value: Option<f64>,

    /// Earliest submission deadline (YYYY-MM-DD)
    #[arg(long)]
    pub deadline_from: Option<String>,

    /// Latest submission deadline (YYYY-MM-DD)
    #[arg(long)]
    pub deadline_to: Option<String>,

    /// Tender type filter (repeatable)
    #[arg(long = "type", value_enum)]
    pub tender_types: Vec<TenderTypeArg>,

    /// Source id to query (repeatable; defaults to all enabled)
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Page size
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Page offset
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Overall search budget in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TenderTypeArg {
    Supply,
    Service,
    Works,
    Mixed,
}

impl From<TenderTypeArg> for TenderType {
    fn from(arg: TenderTypeArg) -> Self {
        match arg {
            TenderTypeArg::Supply => TenderType::Supply,
            TenderTypeArg::Service => TenderType::Service,
            TenderTypeArg::Works => TenderType::Works,
            TenderTypeArg::Mixed => TenderType::Mixed,
        }
    }
}

fn parse_day_start(raw: &str) -> Result<DateTime<Utc>, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| CliError::InvalidDate(raw.to_string()))
}

fn parse_day_end(raw: &str) -> Result<DateTime<Utc>, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| CliError::InvalidDate(raw.to_string()))
}

impl SearchArgs {
    pub fn to_query(&self) -> Result<SearchQuery, CliError> {
        let deadline_from = self
            .deadline_from
            .as_deref()
            .map(parse_day_start)
            .transpose()?;
        let deadline_to = self.deadline_to.as_deref().map(parse_day_end).transpose()?;

        let query = SearchQuery {
            text: self.query.clone(),
            cpv_codes: self.cpv_codes.clone(),
            countries: self.countries.clone(),
            min_value: self.min_value,
            max_value: self.max_value,
            deadline_from,
            deadline_to,
            tender_types: self.tender_types.iter().map(|t| (*t).into()).collect(),
            sources: self.sources.clone(),
            limit: self.limit,
            offset: self.offset,
        };

        query.validate()?;
        Ok(query)
    }
}
