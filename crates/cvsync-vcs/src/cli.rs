//! CVS operations via the `cvs` command-line client.

use crate::cancel::CancellationToken;
use crate::error::{Result, VcsError};
use crate::exclude;
use crate::rlog::{ModuleLog, format_date, parse_checkout_output};
use crate::root::CvsRoot;
use crate::transport::CvsTransport;
use crate::types::{
    CheckoutOptions, CheckoutReport, CheckoutRequest, HistoryEntry, HistoryQuery,
    ReferenceCoverage, SymbolicName, UpdateRequest,
};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured output of a finished cvs process.
#[derive(Debug)]
struct CvsOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Transport backed by the `cvs` executable.
#[derive(Debug, Clone)]
pub struct CvsCli {
    executable: PathBuf,
    timeout: Option<Duration>,
    rsh: Option<String>,
}

impl Default for CvsCli {
    fn default() -> Self {
        Self::new()
    }
}

impl CvsCli {
    /// Use `cvs` from `PATH` with no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executable: PathBuf::from("cvs"),
            timeout: None,
            rsh: None,
        }
    }

    /// Use a specific executable.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Kill commands running longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Remote shell for `:ext:` roots (`CVS_RSH`).
    #[must_use]
    pub fn with_rsh(mut self, rsh: Option<String>) -> Self {
        self.rsh = rsh;
        self
    }

    /// Check if the executable runs.
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn global_args(root: &str, options: Option<&CheckoutOptions>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-d".into(), root.into()];
        if let Some(options) = options {
            if let Some(level) = options.compression_level {
                args.push(format!("-z{}", level.min(9)).into());
            }
            if options.quiet {
                args.push("-q".into());
            }
        }
        args
    }

    fn revision_args(args: &mut Vec<OsString>, revision: Option<&str>, options: &CheckoutOptions) {
        if let Some(rev) = revision {
            args.push("-r".into());
            args.push(rev.into());
            if options.head_fallback {
                args.push("-f".into());
            }
        }
    }

    /// Run cvs, honouring the timeout and the cancellation token.
    fn run(&self, args: &[OsString], cwd: &Path, cancel: &CancellationToken) -> Result<CvsOutput> {
        // args[0..2] is always `-d <root>`
        let subcommand = args
            .iter()
            .skip(2)
            .find(|a| !a.to_string_lossy().starts_with('-'))
            .map_or_else(String::new, |a| a.to_string_lossy().into_owned());
        let command = format!("cvs {subcommand}");
        debug!(command = %command, cwd = ?cwd, "running cvs");

        let mut cmd = Command::new(&self.executable);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(rsh) = &self.rsh {
            cmd.env("CVS_RSH", rsh);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VcsError::ToolNotAvailable {
                    executable: self.executable.display().to_string(),
                }
            } else {
                VcsError::Command {
                    command: command.clone(),
                    message: e.to_string(),
                    exit_code: None,
                }
            }
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || drain(stdout));
        let stderr_reader = thread::spawn(move || drain(stderr));

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if cancel.is_cancelled() {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!(command = %command, "cvs command cancelled");
                        return Err(VcsError::Cancelled);
                    }
                    if let Some(timeout) = self.timeout {
                        if start.elapsed() >= timeout {
                            let _ = child.kill();
                            let _ = child.wait();
                            warn!(command = %command, seconds = timeout.as_secs(), "cvs command timed out");
                            return Err(VcsError::Timeout {
                                seconds: timeout.as_secs(),
                            });
                        }
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(VcsError::Command {
                        command,
                        message: format!("failed to wait for process: {e}"),
                        exit_code: None,
                    });
                }
            }
        };

        Ok(CvsOutput {
            status,
            stdout: stdout_reader.join().unwrap_or_default(),
            stderr: stderr_reader.join().unwrap_or_default(),
        })
    }

    /// Fail with `ReferenceNotFound` unless the revision covers the module.
    ///
    /// `-f` only fills gaps of a reference that exists, so a missing one
    /// fails even with `head_fallback`.
    fn ensure_reference(
        &self,
        root: &str,
        module: &str,
        revision: Option<&str>,
        options: &CheckoutOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(reference) = revision else {
            return Ok(());
        };
        match self.reference_coverage(root, module, reference, cancel)? {
            ReferenceCoverage::Full => Ok(()),
            ReferenceCoverage::Partial if options.head_fallback => Ok(()),
            ReferenceCoverage::Partial => Err(VcsError::reference_not_found(reference, module, true)),
            ReferenceCoverage::Missing => Err(VcsError::reference_not_found(reference, module, false)),
        }
    }

    fn rlog(&self, root: &str, module: &str, extra: &[OsString], cancel: &CancellationToken) -> Result<ModuleLog> {
        let parsed = CvsRoot::parse(root)?;
        let mut args = Self::global_args(root, None);
        args.push("-q".into());
        args.push("rlog".into());
        args.extend_from_slice(extra);
        args.push(module.into());

        let output = self.run(&args, &std::env::temp_dir(), cancel)?;
        if !output.status.success() {
            return Err(parse_cvs_error(&output.stderr, root, module, None));
        }
        let prefix = format!("{}/{module}", parsed.path.trim_end_matches('/'));
        Ok(ModuleLog::parse(&output.stdout, &prefix))
    }
}

fn drain<R: Read>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Classify cvs error output.
#[must_use]
pub fn parse_cvs_error(stderr: &str, root: &str, module: &str, revision: Option<&str>) -> VcsError {
    let lower = stderr.to_lowercase();

    if lower.contains("authentication failed")
        || lower.contains("i hate you")
        || lower.contains("used empty password")
        || lower.contains("permission denied")
    {
        return VcsError::AuthenticationFailed {
            root: root.to_string(),
            reason: stderr.trim().to_string(),
        };
    }

    if let Some(rev) = revision {
        if lower.contains("no such tag") || lower.contains("is not a valid tag") {
            return VcsError::reference_not_found(rev, module, false);
        }
    }

    if lower.contains("connect to")
        || lower.contains("connection refused")
        || lower.contains("unknown host")
        || lower.contains("no such repository")
        || lower.contains("cannot find module")
        || lower.contains("there is no repository")
        || lower.contains("end of file from server")
    {
        return VcsError::RepositoryNotFound {
            root: root.to_string(),
            reason: stderr.trim().to_string(),
        };
    }

    VcsError::Cvs {
        message: stderr.trim().to_string(),
    }
}

impl CvsTransport for CvsCli {
    fn checkout(&self, request: &CheckoutRequest, cancel: &CancellationToken) -> Result<CheckoutReport> {
        debug!(
            root = %request.root,
            module = %request.module,
            revision = ?request.revision,
            dest = ?request.destination,
            "cvs checkout"
        );
        CvsRoot::parse(&request.root)?;
        self.ensure_reference(
            &request.root,
            &request.module,
            request.revision.as_deref(),
            &request.options,
            cancel,
        )?;

        let dest = &request.destination;
        std::fs::create_dir_all(dest).map_err(|e| VcsError::io(dest, e))?;
        let parent = dest.parent().unwrap_or(dest);
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| VcsError::Io {
                path: dest.clone(),
                message: "destination has no directory name".to_string(),
            })?;

        let mut args = Self::global_args(&request.root, Some(&request.options));
        args.push("checkout".into());
        if request.options.prune_empty_directories {
            args.push("-P".into());
        }
        Self::revision_args(&mut args, request.revision.as_deref(), &request.options);
        args.push("-d".into());
        args.push(name.clone().into());
        args.push(request.module.clone().into());

        let output = self.run(&args, parent, cancel)?;
        if !output.status.success() {
            return Err(parse_cvs_error(
                &output.stderr,
                &request.root,
                &request.module,
                request.revision.as_deref(),
            ));
        }

        let mut report = CheckoutReport {
            changes: parse_checkout_output(&output.stdout, Some(&name)),
            head_fallback_used: request.options.head_fallback && request.revision.is_some(),
        };
        exclude::apply(dest, &request.excluded_regions, &mut report)?;

        info!(module = %request.module, files = report.changes.len(), "cvs checkout complete");
        Ok(report)
    }

    fn update(&self, request: &UpdateRequest, cancel: &CancellationToken) -> Result<CheckoutReport> {
        debug!(
            root = %request.root,
            module = %request.module,
            revision = ?request.revision,
            dir = ?request.working_dir,
            "cvs update"
        );
        CvsRoot::parse(&request.root)?;
        self.ensure_reference(
            &request.root,
            &request.module,
            request.revision.as_deref(),
            &request.options,
            cancel,
        )?;

        let mut args = Self::global_args(&request.root, Some(&request.options));
        args.push("update".into());
        args.push("-d".into());
        if request.options.prune_empty_directories {
            args.push("-P".into());
        }
        if request.revision.is_some() {
            Self::revision_args(&mut args, request.revision.as_deref(), &request.options);
        } else {
            args.push("-A".into());
        }

        let output = self.run(&args, &request.working_dir, cancel)?;
        if !output.status.success() {
            return Err(parse_cvs_error(
                &output.stderr,
                &request.root,
                &request.module,
                request.revision.as_deref(),
            ));
        }

        let mut report = CheckoutReport {
            changes: parse_checkout_output(&output.stdout, None),
            head_fallback_used: request.options.head_fallback && request.revision.is_some(),
        };
        exclude::apply(&request.working_dir, &request.excluded_regions, &mut report)?;

        info!(module = %request.module, files = report.changes.len(), "cvs update complete");
        Ok(report)
    }

    fn query_history(&self, query: &HistoryQuery, cancel: &CancellationToken) -> Result<Vec<HistoryEntry>> {
        debug!(
            root = %query.root,
            module = %query.module,
            since = %query.since,
            until = %query.until,
            limit = ?query.limit,
            "cvs rlog"
        );
        let mut extra: Vec<OsString> = vec!["-N".into(), "-S".into()];
        match &query.revision {
            Some(rev) => extra.push(format!("-r{rev}").into()),
            None => extra.push("-b".into()),
        }
        extra.push("-d".into());
        extra.push(format!("{}<{}", format_date(query.since), format_date(query.until)).into());

        let log = self.rlog(&query.root, &query.module, &extra, cancel)?;
        let mut entries: Vec<HistoryEntry> = log
            .history()
            .into_iter()
            .filter(|e| e.timestamp > query.since && e.timestamp <= query.until)
            .collect();
        if let Some(limit) = query.limit {
            entries.truncate(limit as usize);
        }
        Ok(entries)
    }

    fn list_symbolic_names(
        &self,
        root: &str,
        module: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SymbolicName>> {
        let log = self.rlog(root, module, &["-h".into()], cancel)?;
        Ok(log.symbolic_names())
    }

    fn reference_coverage(
        &self,
        root: &str,
        module: &str,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<ReferenceCoverage> {
        let log = self.rlog(root, module, &["-b".into()], cancel)?;
        let coverage = log.coverage(reference);
        debug!(module, reference, ?coverage, "reference coverage");
        Ok(coverage)
    }
}
