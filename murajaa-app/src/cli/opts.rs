use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, ValueEnum)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "murajaa", version, about = "Murajaa CLI/TUI/API")]
pub struct Cli {
    /// Storage backend (applies to CLI/TUI/API unless overridden)
    #[arg(long, value_enum, default_value = "json")]
    pub store: StoreKind,

    /// SQLite DB path when --store sqlite (defaults to app data dir)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Learner roster operations (CLI)
    #[command(subcommand)]
    Learner(LearnerCmd),
    /// Card operations (CLI)
    #[command(subcommand)]
    Card(CardCmd),
    /// Review loop over the due queue (CLI)
    Review(ReviewCmd),
    /// Per-learner progress stats (CLI)
    Stats(StatsCmd),
    /// Export data (CLI)
    #[command(subcommand)]
    Export(ExportCmd),
    /// Import data (CLI)
    #[command(subcommand)]
    Import(ImportCmd),
    /// Launch Terminal UI
    Tui,
    /// Launch Axum HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum LearnerCmd {
    Add { name: String },
    List,
    /// Remove a learner and all of their cards and review events
    Rm { learner: String },
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    Add(CardAdd),
    List {
        #[arg(long)]
        learner: Option<String>,
    },
    Rm {
        card_id: String,
    },
    Edit(CardEdit),
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long)]
    pub learner: String,
    /// Vocabulary item id; generated when omitted
    #[arg(long)]
    pub item: Option<String>,
    #[arg(long)]
    pub front: String,
    #[arg(long)]
    pub back: String,
    #[arg(long)]
    pub transliteration: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CardEdit {
    pub card_id: String,
    #[arg(long)]
    pub front: Option<String>,
    #[arg(long)]
    pub back: Option<String>,
    #[arg(long)]
    pub transliteration: Option<String>,
    #[arg(long)]
    pub clear_transliteration: bool,
    #[arg(long = "add-tag")]
    pub add_tags: Vec<String>,
    #[arg(long = "rm-tag")]
    pub rm_tags: Vec<String>,
    #[arg(long)]
    pub suspend: bool,
    #[arg(long)]
    pub unsuspend: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ReviewCmd {
    #[arg(long)]
    pub learner: String,
    #[arg(long)]
    pub include_new: bool,
    #[arg(long)]
    pub include_lapsed: bool,
    #[arg(long, default_value_t = 50)]
    pub max: usize,
}

#[derive(Debug, Args, Clone)]
pub struct StatsCmd {
    #[arg(long)]
    pub learner: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ExportCmd {
    Json {
        path: PathBuf,
        #[arg(long)]
        learner: Option<String>,
    },
    Csv {
        path: PathBuf,
        #[arg(long)]
        learner: Option<String>,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCmd {
    Json {
        path: PathBuf,
    },
    Csv {
        path: PathBuf,
        #[arg(long)]
        learner: Option<String>,
    },
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
}
