use log::info;
use std::path::Path;

use crate::backend::Backend;
use crate::date::{DateZone, date_label};
use crate::error::Result;
use crate::label::{LabelStyle, release_tag, version_label};
use crate::macros::{MacroNames, OutputFormat, Stamp, append_file, render, write_file};
use crate::runner::CommandRunner;

/// One backend plus the formatting choices for its output.
#[derive(Debug, Clone)]
pub struct Generator {
    pub backend: Backend,
    pub style: LabelStyle,
    pub zone: DateZone,
    pub format: OutputFormat,
    pub names: MacroNames,
}

impl Generator {
    pub fn for_backend(backend: Backend) -> Self {
        Self {
            backend,
            style: LabelStyle::for_backend(backend),
            zone: DateZone::default(),
            format: OutputFormat::default(),
            names: MacroNames {
                version: backend.default_version_macro().to_string(),
                date: backend.default_date_macro().to_string(),
                property_prefix: backend.default_property_prefix(),
            },
        }
    }

    /// Queries the VCS and computes both labels. Any failure aborts.
    pub fn stamp<R: CommandRunner>(&self, runner: &R) -> Result<Stamp> {
        let head = self.backend.head_info(runner)?;
        let version = version_label(&head, &self.style);
        let date = date_label(head.commit_time, self.zone)?;
        let release = release_tag(&head, &self.style).map(str::to_string);
        info!("Version label: {}, date label: {}", version, date);
        Ok(Stamp {
            version,
            date,
            release,
            head,
        })
    }

    pub fn render(&self, stamp: &Stamp) -> String {
        render(stamp, &self.names, self.format)
    }

    pub fn write<R: CommandRunner, P: AsRef<Path>>(&self, runner: &R, output: P) -> Result<Stamp> {
        let stamp = self.stamp(runner)?;
        let rendered = self.render(&stamp);
        if self.format.appends() {
            append_file(output, &rendered)?;
        } else {
            write_file(output, &rendered)?;
        }
        Ok(stamp)
    }
}
