use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Result, StampError};
use crate::runner::{CommandRunner, render_command};

/// Everything the generator needs to know about the head revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadInfo {
    /// Tag names attached to the head revision, backend prefixes removed.
    pub tags: Vec<String>,
    pub revision: String,
    pub modified: bool,
    pub commit_time: CommitTime,
}

/// Committer timestamp; `offset_seconds` is east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitTime {
    pub epoch: i64,
    pub offset_seconds: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Git,
    Hg,
}

/// Backend as requested by the user, before detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Auto,
    Git,
    Hg,
}

impl BackendChoice {
    pub fn resolve(self, dir: &Path) -> Result<Backend> {
        match self {
            BackendChoice::Git => Ok(Backend::Git),
            BackendChoice::Hg => Ok(Backend::Hg),
            BackendChoice::Auto => Backend::detect(dir),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

const GIT_POINTS_AT: &[&str] = &["tag", "--points-at", "HEAD"];
const GIT_NAME_REV: &[&str] = &["name-rev", "--tags", "HEAD"];
const GIT_SHOW_REF: &[&str] = &["show-ref", "--head", "--hash", "HEAD"];
const GIT_STATUS: &[&str] = &["status", "--porcelain"];
const GIT_CAT_FILE: &[&str] = &["cat-file", "commit", "HEAD"];

const HG_TAGS: &[&str] = &["id", "-t"];
const HG_ID: &[&str] = &["id", "-i"];
const HG_DATE: &[&str] = &["log", "-l1", "-r.", "--template", "{date|hgdate}\\n"];

impl Backend {
    /// Walks up from `dir` and picks the first checkout found.
    pub fn detect(dir: &Path) -> Result<Self> {
        // "." has no ancestors of its own
        let absolute = dir
            .canonicalize()
            .map_err(|_| StampError::NoRepository(dir.to_path_buf()))?;
        for ancestor in absolute.ancestors() {
            if ancestor.join(".git").exists() {
                debug!("Found git checkout at {}", ancestor.display());
                return Ok(Backend::Git);
            }
            if ancestor.join(".hg").is_dir() {
                debug!("Found hg checkout at {}", ancestor.display());
                return Ok(Backend::Hg);
            }
        }
        Err(StampError::NoRepository(dir.to_path_buf()))
    }

    pub fn program(&self) -> &'static str {
        match self {
            Backend::Git => "git",
            Backend::Hg => "hg",
        }
    }

    pub fn default_version_macro(&self) -> &'static str {
        match self {
            Backend::Git => "VcsVersion",
            Backend::Hg => "HgVersion",
        }
    }

    pub fn default_date_macro(&self) -> &'static str {
        match self {
            Backend::Git => "VcsDate",
            Backend::Hg => "HgDate",
        }
    }

    /// `build.git` / `build.hg`
    pub fn default_property_prefix(&self) -> String {
        format!("build.{}", self.program())
    }

    pub fn default_output(&self) -> &'static str {
        match self {
            Backend::Git => "vcs-commands.tex",
            Backend::Hg => "hg-cmds.tex",
        }
    }

    /// Characters of the revision id kept when no version tag applies.
    /// `None` keeps the id as the backend prints it.
    pub fn default_revision_length(&self) -> Option<usize> {
        match self {
            Backend::Git => Some(12),
            Backend::Hg => None,
        }
    }

    pub fn head_info<R: CommandRunner>(&self, runner: &R) -> Result<HeadInfo> {
        let info = match self {
            Backend::Git => git_head_info(runner)?,
            Backend::Hg => hg_head_info(runner)?,
        };
        info!(
            "{} head: revision={} tags={:?} modified={} epoch={} offset={}",
            self, info.revision, info.tags, info.modified, info.commit_time.epoch, info.commit_time.offset_seconds
        );
        Ok(info)
    }
}

fn git_head_info<R: CommandRunner>(runner: &R) -> Result<HeadInfo> {
    let points_at = runner.run("git", GIT_POINTS_AT)?;
    let name_rev = runner.run("git", GIT_NAME_REV)?;
    let show_ref = runner.run("git", GIT_SHOW_REF)?;
    let status = runner.run("git", GIT_STATUS)?;
    let commit = runner.run("git", GIT_CAT_FILE)?;

    Ok(HeadInfo {
        tags: git_tags(&points_at, &name_rev),
        revision: parse_git_show_ref(&show_ref),
        modified: !status.trim().is_empty(),
        commit_time: parse_git_commit(&commit)?,
    })
}

fn hg_head_info<R: CommandRunner>(runner: &R) -> Result<HeadInfo> {
    let tags = runner.run("hg", HG_TAGS)?;
    let id = runner.run("hg", HG_ID)?;
    let date = runner.run("hg", HG_DATE)?;

    let (revision, modified) = parse_hg_id(&id);
    Ok(HeadInfo {
        tags: tags.split_whitespace().map(str::to_string).collect(),
        revision,
        modified,
        commit_time: parse_hg_date(&date)?,
    })
}

/// Every tag on HEAD, then the name-rev description for descendants of a tag.
/// `name-rev` alone names a single tag, which may not be the release one.
pub fn git_tags(points_at: &str, name_rev: &str) -> Vec<String> {
    let mut tags: Vec<String> = points_at
        .lines()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(described) = parse_git_name_rev(name_rev).filter(|described| !tags.contains(described)) {
        tags.push(described);
    }
    tags
}

/// `HEAD tags/version_2.3^0` -> `version_2.3`; `HEAD undefined` -> `None`.
pub fn parse_git_name_rev(output: &str) -> Option<String> {
    let line = output.lines().next()?.trim();
    let name = line.strip_prefix("HEAD ").unwrap_or(line).trim();
    let tag = name.strip_prefix("tags/")?;
    let tag = tag.strip_suffix("^0").unwrap_or(tag);
    (!tag.is_empty()).then(|| tag.to_string())
}

pub fn parse_git_show_ref(output: &str) -> String {
    output.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or_default().to_string()
}

/// Pulls the committer timestamp out of a raw `git cat-file commit` object.
pub fn parse_git_commit(output: &str) -> Result<CommitTime> {
    let command = render_command("git", GIT_CAT_FILE);
    let committer = output
        .lines()
        .take_while(|line| !line.is_empty())
        .find(|line| line.starts_with("committer "))
        .ok_or_else(|| StampError::parse(&command, "no committer line"))?;
    debug!("{}", committer);

    let mut fields = committer.rsplitn(3, ' ');
    let (offset, epoch) = match (fields.next(), fields.next()) {
        (Some(offset), Some(epoch)) => (offset, epoch),
        _ => return Err(StampError::parse(&command, format!("malformed committer line: {}", committer))),
    };

    let epoch = epoch
        .parse::<i64>()
        .map_err(|_| StampError::parse(&command, format!("bad commit timestamp: {}", epoch)))?;
    let offset_seconds = parse_git_offset(offset)
        .ok_or_else(|| StampError::parse(&command, format!("bad timezone offset: {}", offset)))?;

    Ok(CommitTime { epoch, offset_seconds })
}

/// `+0130` -> `5400`, `-0800` -> `-28800`.
pub fn parse_git_offset(offset: &str) -> Option<i32> {
    let (sign, digits) = match offset.as_bytes().first()? {
        b'+' => (1, &offset[1..]),
        b'-' => (-1, &offset[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// `hg id -i` marks a dirty working copy with a trailing `+`.
pub fn parse_hg_id(output: &str) -> (String, bool) {
    let id = output.trim();
    (id.replace('+', ""), id.ends_with('+'))
}

/// `{date|hgdate}` prints `<epoch> <offset>` with the offset in seconds west of UTC.
pub fn parse_hg_date(output: &str) -> Result<CommitTime> {
    let command = render_command("hg", HG_DATE);
    let mut fields = output.split_whitespace();
    let (epoch, offset) = match (fields.next(), fields.next()) {
        (Some(epoch), Some(offset)) => (epoch, offset),
        _ => return Err(StampError::parse(&command, format!("expected `<epoch> <offset>`, got {:?}", output.trim()))),
    };

    let epoch = epoch
        .parse::<i64>()
        .map_err(|_| StampError::parse(&command, format!("bad commit timestamp: {}", epoch)))?;
    let west = offset
        .parse::<i32>()
        .map_err(|_| StampError::parse(&command, format!("bad timezone offset: {}", offset)))?;

    Ok(CommitTime {
        epoch,
        offset_seconds: -west,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const COMMIT: &str = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
author Jane Doe <jane@example.com> 1704283200 +0000\n\
committer Jane Doe <jane@example.com> 1704283200 +0100\n\
\n\
Release 2.3\n";

    /// Answers with canned output keyed by the full command line.
    struct FixtureRunner {
        outputs: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl FixtureRunner {
        fn new(outputs: &[(&str, &str)]) -> Self {
            Self {
                outputs: outputs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FixtureRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<String> {
            let command = render_command(program, args);
            self.calls.borrow_mut().push(command.clone());
            self.outputs.get(&command).cloned().ok_or(StampError::CommandFailed {
                command,
                status: "exit status: 128".to_string(),
                stderr: "fatal: not a git repository".to_string(),
            })
        }
    }

    fn git_fixture(points_at: &str, name_rev: &str, status: &str) -> FixtureRunner {
        FixtureRunner::new(&[
            ("git tag --points-at HEAD", points_at),
            ("git name-rev --tags HEAD", name_rev),
            ("git show-ref --head --hash HEAD", "0123456789abcdef0123456789abcdef01234567\n"),
            ("git status --porcelain", status),
            ("git cat-file commit HEAD", COMMIT),
        ])
    }

    #[test]
    fn test_git_head_info_tagged_clean() {
        let runner = git_fixture("version_2.3\n", "HEAD tags/version_2.3\n", "");
        let info = Backend::Git.head_info(&runner).unwrap();

        assert_eq!(info.tags, vec!["version_2.3".to_string()]);
        assert_eq!(info.revision, "0123456789abcdef0123456789abcdef01234567");
        assert!(!info.modified);
        assert_eq!(
            info.commit_time,
            CommitTime {
                epoch: 1704283200,
                offset_seconds: 3600
            }
        );
        assert_eq!(runner.calls.borrow().len(), 5);
    }

    #[test]
    fn test_git_head_info_untagged_dirty() {
        let runner = git_fixture("", "HEAD undefined\n", " M src/main.rs\n");
        let info = Backend::Git.head_info(&runner).unwrap();

        assert!(info.tags.is_empty());
        assert!(info.modified);
    }

    #[test]
    fn test_git_failure_is_fatal() {
        let runner = FixtureRunner::new(&[]);
        let err = Backend::Git.head_info(&runner).unwrap_err();
        assert!(matches!(err, StampError::CommandFailed { .. }));
        assert_eq!(*runner.calls.borrow(), vec!["git tag --points-at HEAD".to_string()]);
    }

    #[test]
    fn test_git_head_info_sees_every_tag_on_head() {
        // name-rev settles on one tag, here not the release one
        let runner = git_fixture("aaa\nversion_2.3\n", "HEAD tags/aaa\n", "");
        let info = Backend::Git.head_info(&runner).unwrap();

        assert_eq!(info.tags, vec!["aaa".to_string(), "version_2.3".to_string()]);
    }

    #[test]
    fn test_git_tags_keeps_descendant_description() {
        assert_eq!(git_tags("", "HEAD tags/version_2.3~2\n"), vec!["version_2.3~2".to_string()]);
        assert_eq!(git_tags("version_2.3\n", "HEAD tags/version_2.3^0\n"), vec!["version_2.3".to_string()]);
        assert!(git_tags("", "HEAD undefined\n").is_empty());
    }

    #[test]
    fn test_parse_git_name_rev() {
        assert_eq!(parse_git_name_rev("HEAD tags/version_2.3\n"), Some("version_2.3".to_string()));
        assert_eq!(parse_git_name_rev("HEAD tags/version_2.3^0\n"), Some("version_2.3".to_string()));
        assert_eq!(parse_git_name_rev("HEAD tags/version_2.3~2\n"), Some("version_2.3~2".to_string()));
        assert_eq!(parse_git_name_rev("HEAD tags/release-1\n"), Some("release-1".to_string()));
        assert_eq!(parse_git_name_rev("HEAD undefined\n"), None);
        assert_eq!(parse_git_name_rev(""), None);
    }

    #[test]
    fn test_parse_git_show_ref_takes_first_hash() {
        let output = "0123456789abcdef0123456789abcdef01234567\nfedcba9876543210fedcba9876543210fedcba98\n";
        assert_eq!(parse_git_show_ref(output), "0123456789abcdef0123456789abcdef01234567");
        assert_eq!(parse_git_show_ref(""), "");
    }

    #[test]
    fn test_parse_git_commit_ignores_message_body() {
        let commit = "tree abc\ncommitter A <a@b> 100 +0000\n\ncommitter Fake <f@k> 999 +0000\n";
        assert_eq!(parse_git_commit(commit).unwrap().epoch, 100);
    }

    #[test]
    fn test_parse_git_commit_missing_committer() {
        let err = parse_git_commit("tree abc\nauthor A <a@b> 100 +0000\n").unwrap_err();
        assert!(matches!(err, StampError::Parse { .. }));
        assert!(err.to_string().contains("no committer line"));
    }

    #[test]
    fn test_parse_git_commit_bad_timestamp() {
        let err = parse_git_commit("committer A <a@b> yesterday +0000\n").unwrap_err();
        assert!(err.to_string().contains("bad commit timestamp"));

        let err = parse_git_commit("committer A <a@b> 100 UTC\n").unwrap_err();
        assert!(err.to_string().contains("bad timezone offset"));
    }

    #[test]
    fn test_parse_git_offset() {
        assert_eq!(parse_git_offset("+0000"), Some(0));
        assert_eq!(parse_git_offset("+0130"), Some(5400));
        assert_eq!(parse_git_offset("-0800"), Some(-28800));
        assert_eq!(parse_git_offset("0800"), None);
        assert_eq!(parse_git_offset("+08"), None);
        assert_eq!(parse_git_offset("+08x0"), None);
        assert_eq!(parse_git_offset("+0199"), None);
        assert_eq!(parse_git_offset("-0060"), None);
        assert_eq!(parse_git_offset("+1459"), Some(14 * 3600 + 59 * 60));
        assert_eq!(parse_git_offset(""), None);
    }

    #[test]
    fn test_hg_head_info() {
        let runner = FixtureRunner::new(&[
            ("hg id -t", "version_2.3 tip\n"),
            ("hg id -i", "a1b2c3d4e5f6+\n"),
            ("hg log -l1 -r. --template {date|hgdate}\\n", "1704283200 -3600\n"),
        ]);
        let info = Backend::Hg.head_info(&runner).unwrap();

        assert_eq!(info.tags, vec!["version_2.3".to_string(), "tip".to_string()]);
        assert_eq!(info.revision, "a1b2c3d4e5f6");
        assert!(info.modified);
        assert_eq!(info.commit_time.offset_seconds, 3600);
    }

    #[test]
    fn test_parse_hg_id() {
        assert_eq!(parse_hg_id("a1b2c3d4e5f6\n"), ("a1b2c3d4e5f6".to_string(), false));
        assert_eq!(parse_hg_id("a1b2c3d4e5f6+\n"), ("a1b2c3d4e5f6".to_string(), true));
    }

    #[test]
    fn test_parse_hg_date() {
        assert_eq!(
            parse_hg_date("1704283200 18000\n").unwrap(),
            CommitTime {
                epoch: 1704283200,
                offset_seconds: -18000
            }
        );
        assert!(parse_hg_date("1704283200\n").is_err());
        assert!(parse_hg_date("soon 0\n").is_err());
    }

    #[test]
    fn test_backend_defaults() {
        assert_eq!(Backend::Git.default_version_macro(), "VcsVersion");
        assert_eq!(Backend::Git.default_date_macro(), "VcsDate");
        assert_eq!(Backend::Git.default_output(), "vcs-commands.tex");
        assert_eq!(Backend::Git.default_revision_length(), Some(12));
        assert_eq!(Backend::Hg.default_version_macro(), "HgVersion");
        assert_eq!(Backend::Hg.default_date_macro(), "HgDate");
        assert_eq!(Backend::Hg.default_output(), "hg-cmds.tex");
        assert_eq!(Backend::Hg.default_revision_length(), None);
        assert_eq!(Backend::Git.default_property_prefix(), "build.git");
        assert_eq!(Backend::Hg.default_property_prefix(), "build.hg");
    }

    #[test]
    fn test_detect_walks_up_to_checkout() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".hg")).unwrap();
        let nested = temp_dir.path().join("manual").join("figures");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(Backend::detect(&nested).unwrap(), Backend::Hg);

        fs::create_dir_all(temp_dir.path().join("manual").join(".git")).unwrap();
        assert_eq!(Backend::detect(&nested).unwrap(), Backend::Git);
    }

    #[test]
    #[serial]
    fn test_detect_from_relative_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".git")).unwrap();
        let manual = temp_dir.path().join("manual");
        fs::create_dir_all(&manual).unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&manual).unwrap();

        let result = Backend::detect(Path::new("."));

        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(result.unwrap(), Backend::Git);
    }

    #[test]
    fn test_detect_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let err = Backend::detect(&missing).unwrap_err();
        assert!(matches!(err, StampError::NoRepository(path) if path == missing));
    }

    #[test]
    fn test_choice_resolve_explicit_skips_detection() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(BackendChoice::Hg.resolve(temp_dir.path()).unwrap(), Backend::Hg);
        assert_eq!(BackendChoice::Git.resolve(temp_dir.path()).unwrap(), Backend::Git);
    }
}
