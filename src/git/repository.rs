use crate::domain::RawBranch;
use crate::error::{Result, UpmergeError};
use crate::git::{MergeOptions, MergeSummary, RepoStatus};
use git2::{BranchType, ErrorCode, Repository as Git2Repo, Status, StatusOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const REMOTES_PREFIX: &str = "refs/remotes/";

/// A working copy on disk.
///
/// Reads go through `git2`; mutations run the `git` executable inside the
/// working directory.
pub struct Git2Repository {
    repo: Git2Repo,
    workdir: PathBuf,
}

impl Git2Repository {
    /// Open the repository containing `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| UpmergeError::precondition("Repository has no working directory"))?
            .to_path_buf();

        Ok(Git2Repository { repo, workdir })
    }

    /// Working directory of the repository
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(args = ?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;
        Ok(output)
    }

    /// Run git and fail on a non-zero exit, returning stdout
    fn git(&self, args: &[&str]) -> Result<String> {
        let output = self.run_git(args)?;
        if !output.status.success() {
            return Err(command_failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn ahead_behind(&self, local: git2::Oid, upstream: git2::Oid) -> Result<(usize, usize)> {
        Ok(self.repo.graph_ahead_behind(local, upstream)?)
    }

    /// Upstream of a local branch as `(short upstream name, target)`.
    /// Returns `Ok(None)` when no upstream is configured.
    fn upstream_of(&self, branch: &str) -> Result<Option<(String, Option<git2::Oid>)>> {
        let upstream = match self
            .repo
            .branch_upstream_name(&format!("refs/heads/{}", branch))
        {
            Ok(buf) => buf,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let Some(full) = upstream.as_str() else {
            return Ok(None);
        };
        let short = full.strip_prefix(REMOTES_PREFIX).unwrap_or(full).to_string();

        match self.repo.find_reference(full) {
            Ok(reference) => Ok(Some((short, reference.target()))),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(Some((short, None))),
            Err(e) => Err(e.into()),
        }
    }
}

fn command_failure(args: &[&str], output: &Output) -> UpmergeError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    UpmergeError::command(format!(
        "git {} exited with code {}: {}",
        args.join(" "),
        output.status.code().unwrap_or(-1),
        detail
    ))
}

/// `local` has the same name as the remote branch `upstream` (`<remote>/<local>`)
fn is_namesake(local: &str, upstream: &str) -> bool {
    upstream
        .split_once('/')
        .is_some_and(|(_, short)| short == local)
}

fn is_already_up_to_date(stdout: &str) -> bool {
    stdout.contains("Already up to date") || stdout.contains("Already up-to-date")
}

impl super::Repository for Git2Repository {
    fn fetch(&self, remote: &str) -> Result<()> {
        self.git(&["fetch", "--prune", remote])?;
        Ok(())
    }

    fn status(&self) -> Result<RepoStatus> {
        let mut status = RepoStatus::default();

        match self.repo.head() {
            Ok(head) if head.is_branch() => {
                if let Some(name) = head.shorthand() {
                    status.current = Some(name.to_string());
                    if let Some((upstream, target)) = self.upstream_of(name)? {
                        if let (Some(local), Some(remote)) = (head.target(), target) {
                            let (ahead, behind) = self.ahead_behind(local, remote)?;
                            status.ahead = ahead;
                            status.behind = behind;
                        }
                        status.tracking = Some(upstream);
                    }
                }
            }
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // No commits yet; HEAD still names a branch
                if let Ok(reference) = self.repo.find_reference("HEAD") {
                    status.current = reference
                        .symbolic_target()
                        .and_then(|t| t.strip_prefix("refs/heads/"))
                        .map(str::to_string);
                }
            }
            Err(e) => return Err(e.into()),
        }

        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        for entry in self.repo.statuses(Some(&mut options))?.iter() {
            let Some(path) = entry.path() else {
                continue;
            };
            let path = path.to_string();
            let flags = entry.status();

            if flags.contains(Status::CONFLICTED) {
                status.conflicted.push(path);
            } else if flags.contains(Status::WT_NEW) {
                status.untracked.push(path);
            } else {
                if flags.intersects(
                    Status::INDEX_NEW
                        | Status::INDEX_MODIFIED
                        | Status::INDEX_DELETED
                        | Status::INDEX_RENAMED
                        | Status::INDEX_TYPECHANGE,
                ) {
                    status.staged.push(path.clone());
                }
                if flags.intersects(
                    Status::WT_MODIFIED
                        | Status::WT_DELETED
                        | Status::WT_RENAMED
                        | Status::WT_TYPECHANGE,
                ) {
                    status.modified.push(path);
                }
            }
        }

        Ok(status)
    }

    fn list_branches(&self) -> Result<Vec<RawBranch>> {
        let mut branches = Vec::new();
        let mut tracked: HashMap<String, (usize, usize)> = HashMap::new();
        let mut gone = Vec::new();

        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            let mut local = RawBranch::local(&name);

            // Only `release/2.0` speaks for `origin/release/2.0`; temporary
            // and feature branches tracking the same upstream are ignored
            let upstream = self
                .upstream_of(&name)?
                .filter(|(upstream, _)| is_namesake(&name, upstream));
            if let Some((upstream, target)) = upstream {
                match (branch.get().target(), target) {
                    (Some(local_oid), Some(remote_oid)) => {
                        let (ahead, behind) = self.ahead_behind(local_oid, remote_oid)?;
                        local.ahead = ahead;
                        local.behind = behind;
                        tracked.insert(upstream, (ahead, behind));
                    }
                    (_, None) => {
                        local.is_gone = true;
                        gone.push(RawBranch {
                            name: upstream,
                            is_remote: true,
                            is_gone: true,
                            ..RawBranch::default()
                        });
                    }
                    (None, Some(_)) => {}
                }
            }

            branches.push(local);
        }

        for entry in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            if name.ends_with("/HEAD") {
                continue;
            }
            let (ahead, behind) = tracked.get(&name).copied().unwrap_or((0, 0));
            branches.push(RawBranch {
                ahead,
                behind,
                ..RawBranch::remote(name)
            });
        }

        branches.extend(gone);
        Ok(branches)
    }

    fn checkout_branch(&self, name: &str, create_from: Option<&str>) -> Result<()> {
        match create_from {
            Some(from) => self.git(&["checkout", "-b", name, "--track", from])?,
            None => self.git(&["checkout", name])?,
        };
        Ok(())
    }

    fn merge(
        &self,
        remote: Option<&str>,
        branch: &str,
        options: &MergeOptions,
    ) -> Result<MergeSummary> {
        let source = match remote {
            Some(remote) => format!("{}/{}", remote, branch),
            None => branch.to_string(),
        };

        let mut args = vec!["merge", "--no-edit"];
        if options.no_fast_forward {
            args.push("--no-ff");
        }
        if options.no_commit {
            args.push("--no-commit");
        }
        args.push(&source);

        let output = self.run_git(&args)?;
        if !output.status.success() {
            let error = command_failure(&args, &output);
            if let Err(abort_error) = self.git(&["merge", "--abort"]) {
                tracing::warn!(error = %abort_error, "could not abort failed merge");
            }
            return Err(error);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let up_to_date = is_already_up_to_date(&stdout);
        let files = if options.list_files && !up_to_date && !options.no_commit {
            self.git(&["diff", "--name-only", "HEAD^1", "HEAD"])?
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        Ok(MergeSummary { up_to_date, files })
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        self.git(&["push", remote, refspec])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        self.git(&["branch", "-d", name])?;
        Ok(())
    }

    fn raw_command(&self, args: &[&str]) -> Result<String> {
        self.git(args)
    }
}
