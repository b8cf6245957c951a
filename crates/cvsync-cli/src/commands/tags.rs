//! Tags command implementation.

use crate::commands::Cli;
use crate::context::Context;
use crate::output;
use anyhow::{Context as _, Result};
use clap::Args;
use cvsync_vcs::{CancellationToken, CvsTransport, SymbolicName};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Arguments for the tags command.
#[derive(Args, Debug, Clone)]
pub struct TagsArgs {
    /// CVSROOT of the repository
    #[arg(short = 'r', long, value_name = "CVSROOT", env = "CVSROOT")]
    pub root: String,

    /// Remote module name
    pub module: String,

    /// Only list branches
    #[arg(long, conflicts_with = "tags_only")]
    pub branches_only: bool,

    /// Only list tags
    #[arg(long)]
    pub tags_only: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct NameSummary {
    name: String,
    branch: bool,
    files: usize,
}

/// Collapse per-file symbolic names into one entry per name.
fn summarize(names: &[SymbolicName]) -> Vec<NameSummary> {
    let mut by_name: BTreeMap<&str, NameSummary> = BTreeMap::new();
    for symbolic in names {
        let entry = by_name
            .entry(symbolic.name.as_str())
            .or_insert_with(|| NameSummary {
                name: symbolic.name.clone(),
                branch: symbolic.is_branch(),
                files: 0,
            });
        entry.files += 1;
    }
    by_name.into_values().collect()
}

/// Run the tags command.
pub fn run(cli: &Cli, args: &TagsArgs) -> Result<()> {
    info!(root = %args.root, module = %args.module, "running tags command");

    let ctx = Context::new(cli.settings.as_deref())?;
    let names = ctx
        .transport()
        .list_symbolic_names(&args.root, &args.module, &CancellationToken::new())
        .with_context(|| format!("failed to list symbolic names of {}", args.module))?;

    let summary: Vec<NameSummary> = summarize(&names)
        .into_iter()
        .filter(|n| !(args.branches_only && !n.branch) && !(args.tags_only && n.branch))
        .collect();

    if output::is_json() {
        return output::print_json(&summary);
    }
    for name in &summary {
        let kind = if name.branch { "branch" } else { "tag" };
        println!("{:<6} {} ({} file(s))", kind, name.name, name.files);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sym(path: &str, name: &str, revision: &str) -> SymbolicName {
        SymbolicName {
            path: path.into(),
            name: name.into(),
            revision: revision.into(),
        }
    }

    #[test]
    fn summarizes_per_name() {
        let names = vec![
            sym("a.txt", "fooTag", "1.1"),
            sym("b.txt", "fooTag", "1.3"),
            sym("a.txt", "fooBranch", "1.1.0.2"),
        ];
        assert_eq!(
            summarize(&names),
            vec![
                NameSummary {
                    name: "fooBranch".into(),
                    branch: true,
                    files: 1,
                },
                NameSummary {
                    name: "fooTag".into(),
                    branch: false,
                    files: 2,
                },
            ]
        );
    }
}
