//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default migrations root inside the migration image
pub const DEFAULT_MIGRATIONS_DIR: &str = "/opt/migrations";

/// Convoy - applies conversation-platform migrations and inspects state history
#[derive(Parser, Debug)]
#[command(name = "cv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Migrations root directory
    #[arg(
        short = 'd',
        long,
        global = true,
        env = "CONVOY_MIGRATIONS_DIR",
        default_value = DEFAULT_MIGRATIONS_DIR
    )]
    pub dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Select a named target from the config
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the migration plan to the database
    Migrate(MigrateArgs),

    /// Show the resolved migration plan without touching any database
    Plan(PlanArgs),

    /// Scaffold a migrations directory with the conversation audit schema
    Init(InitArgs),

    /// Record and inspect conversation state history (DuckDB)
    History(HistoryArgs),
}

/// Database backend
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Embedded DuckDB file
    Duckdb,
    /// PostgreSQL through the psql client
    Postgres,
}

/// Connection overrides; each one beats the config file and target
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Database backend
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// DuckDB database file
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user
    #[arg(long, env = "POSTGRES_USER")]
    pub user: Option<String>,

    /// PostgreSQL database name
    #[arg(long, env = "POSTGRES_DB")]
    pub dbname: Option<String>,

    /// PostgreSQL host
    #[arg(long, env = "POSTGRES_HOST")]
    pub host: Option<String>,

    /// PostgreSQL port
    #[arg(long, env = "POSTGRES_PORT")]
    pub port: Option<u16>,

    /// psql executable
    #[arg(long, env = "CONVOY_PSQL", default_value = "psql")]
    pub psql: String,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Connection settings
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format for the final report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: MigrateOutput,
}

/// Migrate output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateOutput {
    /// Per-file progress lines and a summary
    Text,
    /// JSON report on stdout
    Json,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Listing output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to scaffold (defaults to --dir)
    pub path: Option<String>,

    /// SQL dialect of the generated migrations
    #[arg(long, value_enum, default_value = "duckdb")]
    pub dialect: Backend,

    /// Overwrite files that already exist
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// DuckDB database file (defaults to the configured path)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// History subcommand
    #[command(subcommand)]
    pub command: HistoryCommands,
}

/// History subcommands
#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Create a conversation
    Open(OpenArgs),

    /// Append a status transition to a conversation
    Append(AppendArgs),

    /// List the transitions of a conversation, oldest first
    List(ListArgs),

    /// Delete a conversation and its history
    Delete(DeleteArgs),
}

/// Arguments for history open
#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Conversation id
    pub conv_id: String,

    /// Initial conversation status
    #[arg(long, default_value = "active")]
    pub status: String,
}

/// Arguments for history append
#[derive(Args, Debug)]
pub struct AppendArgs {
    /// Conversation id
    pub conv_id: String,

    /// New status
    #[arg(long = "to")]
    pub to_status: String,

    /// Prior status
    #[arg(long = "from")]
    pub from_status: Option<String>,

    /// Actor category (user, agent, system, supervisor, tool, support)
    #[arg(long, default_value = "system")]
    pub actor_type: String,

    /// Actor identifier
    #[arg(long)]
    pub actor_id: Option<String>,

    /// Reason for the transition
    #[arg(long)]
    pub reason: Option<String>,

    /// Metadata entry as key=value; the value is parsed as JSON when possible
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,

    /// Explicit history id instead of a generated one
    #[arg(long)]
    pub id: Option<String>,

    /// Print the stored row as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for history list
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Conversation id
    pub conv_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for history delete
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Conversation id
    pub conv_id: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
