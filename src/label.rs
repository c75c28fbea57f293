use crate::backend::{Backend, HeadInfo};

pub const UNKNOWN: &str = "Unknown";
pub const MODIFIED_SUFFIX: &str = " (modified)";
pub const DEFAULT_TAG_MARKER: &str = "version_";

/// How a head revision is turned into a version label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelStyle {
    pub tag_marker: String,
    pub revision_length: Option<usize>,
    pub revision_prefix: String,
}

impl LabelStyle {
    pub fn for_backend(backend: Backend) -> Self {
        Self {
            tag_marker: DEFAULT_TAG_MARKER.to_string(),
            revision_length: backend.default_revision_length(),
            revision_prefix: String::new(),
        }
    }
}

/// Release tags win over the revision id; a dirty working copy is always flagged.
pub fn version_label(info: &HeadInfo, style: &LabelStyle) -> String {
    let release = release_tag(info, style).and_then(|tag| tag.strip_prefix(style.tag_marker.as_str()));

    let mut label = match release {
        Some(suffix) => suffix.to_string(),
        None => revision_label(&info.revision, style),
    };

    if info.modified {
        label.push_str(MODIFIED_SUFFIX);
    }
    label
}

/// The first tag carrying the release marker with something after it.
pub fn release_tag<'a>(info: &'a HeadInfo, style: &LabelStyle) -> Option<&'a str> {
    info.tags
        .iter()
        .map(String::as_str)
        .find(|tag| tag.strip_prefix(style.tag_marker.as_str()).is_some_and(|suffix| !suffix.is_empty()))
}

fn revision_label(revision: &str, style: &LabelStyle) -> String {
    let short: String = match style.revision_length {
        Some(length) => revision.trim().chars().take(length).collect(),
        None => revision.trim().to_string(),
    };
    if short.is_empty() {
        return UNKNOWN.to_string();
    }
    format!("{}{}", style.revision_prefix, short)
}
