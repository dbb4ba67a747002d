use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "voiceprint",
    version,
    about = "Dialogue attribution, character voice profiles and consistency flags"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Characters(CharactersArgs),
    Merge(MergeArgs),
    Profile(ProfileArgs),
    Flags(FlagsArgs),
    Dismiss(DismissArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/voiceprint")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long = "patterns")]
    pub patterns_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Chapter text files, in reading order.
    #[arg(required = true)]
    pub chapters: Vec<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[arg(long)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CharactersArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub project_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub project_id: String,

    #[arg(long)]
    pub first: String,

    #[arg(long)]
    pub second: String,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub character_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct FlagsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub character_id: String,

    #[arg(long, default_value_t = false)]
    pub active_only: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DismissArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub character_id: String,

    #[arg(long)]
    pub flag_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}
