use chrono::{DateTime, Datelike, FixedOffset, Local, TimeZone, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::CommitTime;
use crate::error::{Result, StampError};

/// Zone the commit timestamp is rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateZone {
    /// Zone of the machine running the tool; the commit's own offset is ignored.
    #[default]
    Local,
    Utc,
    /// Offset recorded with the commit.
    Commit,
}

pub fn date_label(time: CommitTime, zone: DateZone) -> Result<String> {
    let utc = DateTime::<Utc>::from_timestamp(time.epoch, 0).ok_or(StampError::Timestamp(time.epoch))?;

    let label = match zone {
        DateZone::Local => format_date(&utc.with_timezone(&Local)),
        DateZone::Utc => format_date(&utc),
        DateZone::Commit => {
            let offset = FixedOffset::east_opt(time.offset_seconds).ok_or_else(|| {
                StampError::parse("commit timestamp", format!("offset {}s is out of range", time.offset_seconds))
            })?;
            format_date(&utc.with_timezone(&offset))
        }
    };
    Ok(label)
}

/// `3 January 2024`: day without a leading zero, full English month name.
pub fn format_date<Tz: TimeZone>(datetime: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("{} {}", datetime.day(), datetime.format("%B %Y"))
}
