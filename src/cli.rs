use clap::Parser;
use std::path::PathBuf;

use crate::backend::BackendChoice;
use crate::date::DateZone;
use crate::macros::OutputFormat;

#[derive(Parser)]
#[command(
    name = "vcs-stamp",
    about = "Writes the current VCS version label and commit date as typesetting macros",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/vcs-stamp/logs/vcs-stamp.log\n\nWith no options, writes vcs-commands.tex (git) or hg-cmds.tex (hg) in the current directory:\n  \\def\\VcsVersion{2.3 (modified)}\n  \\def\\VcsDate{3 January 2024}\n\nAdd the output file to the ignore list of the checkout; an untracked output file marks the next run as (modified).\nThe properties format appends build.<vcs>.committerdate, .tag, .hash and .dirty to the output file."
)]
pub struct Cli {
    /// Version control backend
    #[arg(short, long, value_enum, help = "Version control backend (default: auto)")]
    pub backend: Option<BackendChoice>,

    /// Directory inside the checkout to query
    #[arg(short, long, help = "Directory inside the checkout to query (default: .)")]
    pub repo: Option<PathBuf>,

    /// Output file
    #[arg(short, long, help = "Output file (default: vcs-commands.tex or hg-cmds.tex)")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, help = "Output format (default: tex)")]
    pub format: Option<OutputFormat>,

    /// Zone used to render the commit date
    #[arg(short, long, value_enum, help = "Zone used to render the commit date (default: local)")]
    pub timezone: Option<DateZone>,

    /// Print to stdout instead of writing a file
    #[arg(long, help = "Print to stdout instead of writing a file")]
    pub stdout: bool,

    /// Path to config file
    #[arg(short, long, help = "Path to config file")]
    pub config: Option<PathBuf>,
}
