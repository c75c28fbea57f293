use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::backend::HeadInfo;
use crate::error::{Result, StampError};

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Written as the property tag when HEAD carries no release tag.
pub const UNDEFINED_TAG: &str = "undefined";

/// The two labels that end up in the output, plus the raw head they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub version: String,
    pub date: String,
    /// Full name of the release tag on HEAD, if any.
    pub release: Option<String>,
    pub head: HeadInfo,
}

/// Names used in the output: macro names, or the key prefix for properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroNames {
    pub version: String,
    pub date: String,
    pub property_prefix: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `\def\Name{value}` lines
    #[default]
    Tex,
    /// `:revnumber:` and `:revdate:` document attributes
    Asciidoc,
    /// `build.<vcs>.*` build properties, appended to the output
    Properties,
}

impl OutputFormat {
    /// Properties files are shared with the rest of the build, so they grow.
    pub fn appends(&self) -> bool {
        matches!(self, OutputFormat::Properties)
    }
}

/// Tex and AsciiDoc render exactly two newline-terminated lines. Values are not escaped.
pub fn render(stamp: &Stamp, names: &MacroNames, format: OutputFormat) -> String {
    match format {
        OutputFormat::Tex => format!(
            "\\def\\{}{{{}}}{nl}\\def\\{}{{{}}}{nl}",
            names.version,
            stamp.version,
            names.date,
            stamp.date,
            nl = LINE_ENDING
        ),
        OutputFormat::Asciidoc => format!(
            ":revnumber: {}{nl}:revdate: {}{nl}",
            stamp.version,
            stamp.date,
            nl = LINE_ENDING
        ),
        OutputFormat::Properties => {
            let prefix = &names.property_prefix;
            format!(
                "{prefix}.committerdate={}{nl}{prefix}.tag={}{nl}{prefix}.hash={}{nl}{prefix}.dirty={}{nl}",
                stamp.head.commit_time.epoch,
                stamp.release.as_deref().unwrap_or(UNDEFINED_TAG),
                stamp.head.revision,
                stamp.head.modified,
                nl = LINE_ENDING
            )
        }
    }
}

/// Replaces whatever was at `path`.
pub fn write_file<P: AsRef<Path>>(path: P, contents: &str) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, contents).map_err(|source| StampError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Adds to the end of `path`, creating it if needed.
pub fn append_file<P: AsRef<Path>>(path: P, contents: &str) -> Result<()> {
    let path = path.as_ref();
    let io_error = |source: std::io::Error| StampError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)?;
    info!("Appended to {}", path.display());
    Ok(())
}
