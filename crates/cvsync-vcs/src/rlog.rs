//! Parsers for `cvs rlog` and checkout/update output.

use crate::types::{
    FileAction, FileChange, HistoryEntry, ReferenceCoverage, SymbolicName,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::LazyLock;
use regex::Regex;

static DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^date:\s*([^;]+);\s*author:\s*([^;]+);\s*state:\s*([^;]+);")
        .expect("static date regex")
});

const REVISION_SEPARATOR: &str = "----------------------------";
const FILE_SEPARATOR: &str =
    "=============================================================================";

/// One revision of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    /// Revision number.
    pub revision: String,
    /// Commit time.
    pub date: DateTime<Utc>,
    /// Committer.
    pub author: String,
    /// RCS state, `dead` for removals.
    pub state: String,
    /// Commit message.
    pub message: String,
}

impl RevisionInfo {
    /// Whether the file was removed in this revision.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == "dead"
    }

    /// Whether the revision is on the trunk.
    #[must_use]
    pub fn is_trunk(&self) -> bool {
        self.revision.split('.').count() == 2
    }
}

/// The rlog record of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLog {
    /// Path relative to the module.
    pub path: String,
    /// `(name, revision)` pairs.
    pub symbolic_names: Vec<(String, String)>,
    /// Selected revisions, newest first as printed by cvs.
    pub revisions: Vec<RevisionInfo>,
}

impl FileLog {
    fn revision_for(&self, reference: &str) -> Option<&str> {
        self.symbolic_names
            .iter()
            .find(|(name, _)| name == reference)
            .map(|(_, rev)| rev.as_str())
    }

    /// Whether the file was live on the trunk at `at`.
    #[must_use]
    pub fn live_at(&self, at: DateTime<Utc>) -> bool {
        self.revisions
            .iter()
            .filter(|r| r.is_trunk() && r.date <= at)
            .max_by_key(|r| r.date)
            .is_some_and(|r| !r.is_dead())
    }

    fn date_of(&self, revision: &str) -> Option<DateTime<Utc>> {
        self.revisions
            .iter()
            .find(|r| r.revision == revision)
            .map(|r| r.date)
    }
}

/// Parsed rlog output for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleLog {
    /// One record per file, in output order.
    pub files: Vec<FileLog>,
}

impl ModuleLog {
    /// Parse rlog output.
    ///
    /// `repository_prefix` is the server path of the module, e.g.
    /// `/var/lib/cvs/fooModule`; file paths are reported relative to it.
    #[must_use]
    pub fn parse(output: &str, repository_prefix: &str) -> Self {
        let prefix = format!("{}/", repository_prefix.trim_end_matches('/'));
        let mut files = Vec::new();
        let mut current: Option<FileLog> = None;
        let mut lines = output.lines().peekable();

        while let Some(line) = lines.next() {
            if let Some(rcs) = line.strip_prefix("RCS file: ") {
                if let Some(done) = current.take() {
                    files.push(done);
                }
                current = Some(FileLog {
                    path: relative_path(rcs.trim(), &prefix),
                    ..FileLog::default()
                });
                continue;
            }
            let Some(file) = current.as_mut() else {
                continue;
            };

            if line == "symbolic names:" {
                while let Some(next) = lines.peek() {
                    if !next.starts_with('\t') && !next.starts_with("    ") {
                        break;
                    }
                    if let Some((name, rev)) = next.trim().split_once(':') {
                        file.symbolic_names
                            .push((name.trim().to_string(), rev.trim().to_string()));
                    }
                    lines.next();
                }
            } else if let Some(rev) = line.strip_prefix("revision ") {
                let revision = rev.split_whitespace().next().unwrap_or_default().to_string();
                let Some(caps) = lines.next().and_then(|l| DATE_LINE.captures(l)) else {
                    continue;
                };
                let Some(date) = parse_date(&caps[1]) else {
                    continue;
                };
                let mut message = Vec::new();
                while let Some(next) = lines.peek() {
                    if *next == REVISION_SEPARATOR || *next == FILE_SEPARATOR {
                        break;
                    }
                    if !next.starts_with("branches:") {
                        message.push(*next);
                    }
                    lines.next();
                }
                file.revisions.push(RevisionInfo {
                    revision,
                    date,
                    author: caps[2].trim().to_string(),
                    state: caps[3].trim().to_string(),
                    message: message.join("\n"),
                });
            } else if line == FILE_SEPARATOR {
                if let Some(done) = current.take() {
                    files.push(done);
                }
            }
        }
        if let Some(done) = current.take() {
            files.push(done);
        }

        Self { files }
    }

    /// Every (file, name) pair.
    #[must_use]
    pub fn symbolic_names(&self) -> Vec<SymbolicName> {
        self.files
            .iter()
            .flat_map(|f| {
                f.symbolic_names.iter().map(|(name, revision)| SymbolicName {
                    path: f.path.clone(),
                    name: name.clone(),
                    revision: revision.clone(),
                })
            })
            .collect()
    }

    /// How much of the module `reference` covers.
    ///
    /// The reference is dated by the newest revision it points at; any other
    /// file live on the trunk at that time without the reference makes the
    /// coverage partial. Files added later do not count.
    #[must_use]
    pub fn coverage(&self, reference: &str) -> ReferenceCoverage {
        let tagged: Vec<(&FileLog, &str)> = self
            .files
            .iter()
            .filter_map(|f| f.revision_for(reference).map(|rev| (f, rev)))
            .collect();
        if tagged.is_empty() {
            return ReferenceCoverage::Missing;
        }

        let applied_at = tagged
            .iter()
            .filter_map(|(f, rev)| f.date_of(&branch_point(rev)))
            .max();
        let Some(applied_at) = applied_at else {
            return ReferenceCoverage::Full;
        };

        let missing = self
            .files
            .iter()
            .filter(|f| f.revision_for(reference).is_none())
            .any(|f| f.live_at(applied_at));
        if missing {
            ReferenceCoverage::Partial
        } else {
            ReferenceCoverage::Full
        }
    }

    /// Flatten into history entries, newest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self
            .files
            .iter()
            .flat_map(|f| {
                f.revisions.iter().map(|r| HistoryEntry {
                    path: f.path.clone(),
                    timestamp: r.date,
                    revision: r.revision.clone(),
                    author: r.author.clone(),
                    message: r.message.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.path.cmp(&b.path)));
        entries
    }
}

/// The trunk revision a branch number sprouts from; tags map to themselves.
fn branch_point(revision: &str) -> String {
    let parts: Vec<&str> = revision.split('.').collect();
    if parts.len() >= 4 && parts[parts.len() - 2] == "0" {
        parts[..parts.len() - 2].join(".")
    } else if parts.len() % 2 == 1 && parts.len() > 1 {
        parts[..parts.len() - 1].join(".")
    } else {
        revision.to_string()
    }
}

fn relative_path(rcs: &str, prefix: &str) -> String {
    let path = rcs.strip_suffix(",v").unwrap_or(rcs);
    let path = path.strip_prefix(prefix).unwrap_or(path);
    match path.rsplit_once('/') {
        Some((dir, name)) if dir == "Attic" => name.to_string(),
        Some((dir, name)) if dir.ends_with("/Attic") => {
            format!("{}/{name}", dir.trim_end_matches("/Attic"))
        }
        _ => path.to_string(),
    }
}

/// Parse a date as printed by old (`2011/01/31 10:00:00`) and new
/// (`2011-01-31 10:00:00 +0000`) cvs releases.
#[must_use]
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y/%m/%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a date for `rlog -d`.
#[must_use]
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S +0000").to_string()
}

/// Parse checkout or update output into file changes.
///
/// `strip` is a leading directory to remove from reported paths.
#[must_use]
pub fn parse_checkout_output(output: &str, strip: Option<&str>) -> Vec<FileChange> {
    output
        .lines()
        .filter_map(|line| {
            let mut chars = line.chars();
            let action = FileAction::from_code(chars.next()?)?;
            if chars.next()? != ' ' {
                return None;
            }
            let path = line[2..].trim();
            let path = path.strip_prefix("./").unwrap_or(path);
            let path = match strip {
                Some(dir) => path
                    .strip_prefix(dir)
                    .and_then(|p| p.strip_prefix('/'))
                    .unwrap_or(path),
                None => path,
            };
            Some(FileChange {
                path: path.to_string(),
                action,
            })
        })
        .collect()
}
