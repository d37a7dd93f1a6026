use crate::domain::RawBranch;
use crate::error::{Result, UpmergeError};
use crate::git::{MergeOptions, MergeSummary, RepoStatus, Repository};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    status: RepoStatus,
    branches: Vec<RawBranch>,
    local_branches: BTreeSet<String>,
    logs: HashMap<String, String>,
    conflicts: HashSet<String>,
    up_to_date: HashSet<String>,
    undeletable: HashSet<String>,
    merge_files: Vec<String>,
    fetch_error: Option<String>,
    push_error: Option<String>,
    calls: Vec<String>,
}

/// In-memory backend for tests.
///
/// Every call is recorded as a short command-like string (`"fetch origin"`,
/// `"checkout -b <name> <from>"`, `"merge <source>"`, `"push <remote>
/// <refspec>"`, `"delete <name>"`, `"raw <args>"`) so tests can assert on
/// the exact sequence of operations.
#[derive(Debug, Default)]
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    /// Create a mock with `current` checked out, clean and up to date
    pub fn new(current: &str) -> Self {
        let mut state = MockState::default();
        state.status.current = Some(current.to_string());
        state.local_branches.insert(current.to_string());
        MockRepository {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from assertions
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add remote branches (remote-qualified names)
    pub fn with_remote_branches(self, names: &[&str]) -> Self {
        self.lock()
            .branches
            .extend(names.iter().map(|n| RawBranch::remote(*n)));
        self
    }

    /// Add a raw branch entry as-is
    pub fn with_branch(self, branch: RawBranch) -> Self {
        self.lock().branches.push(branch);
        self
    }

    /// Replace the working-copy status (the current branch is kept unless set)
    pub fn with_status(self, status: RepoStatus) -> Self {
        {
            let mut state = self.lock();
            let current = state.status.current.clone();
            state.status = status;
            if state.status.current.is_none() {
                state.status.current = current;
            }
        }
        self
    }

    /// Detach HEAD
    pub fn with_detached_head(self) -> Self {
        self.lock().status.current = None;
        self
    }

    /// Output returned for `git log ... <range>`, keyed by range (`a..b`)
    pub fn with_log(self, range: &str, output: &str) -> Self {
        self.lock()
            .logs
            .insert(range.to_string(), output.to_string());
        self
    }

    /// Make merges into the temporary branch of `target` fail.
    /// `target` is the short branch name, e.g. `release/23.2`.
    pub fn with_conflict_on(self, target: &str) -> Self {
        self.lock().conflicts.insert(target.to_string());
        self
    }

    /// Make merges into the temporary branch of `target` change nothing,
    /// as when the target already contains the source
    pub fn with_up_to_date_on(self, target: &str) -> Self {
        self.lock().up_to_date.insert(target.to_string());
        self
    }

    /// Make deleting the named local branch fail
    pub fn with_undeletable_branch(self, name: &str) -> Self {
        self.lock().undeletable.insert(name.to_string());
        self
    }

    /// Files reported by every merge that asks for them
    pub fn with_merge_files(self, files: &[&str]) -> Self {
        self.lock().merge_files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_fetch_error(self, message: &str) -> Self {
        self.lock().fetch_error = Some(message.to_string());
        self
    }

    pub fn with_push_error(self, message: &str) -> Self {
        self.lock().push_error = Some(message.to_string());
        self
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Recorded calls starting with `prefix`
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Currently checked-out branch
    pub fn current_branch(&self) -> Option<String> {
        self.lock().status.current.clone()
    }

    /// Local branches that currently exist
    pub fn local_branches(&self) -> Vec<String> {
        self.lock().local_branches.iter().cloned().collect()
    }
}

/// `upmerge-abc123/release/23.2` → `release/23.2`
fn target_of_temp_branch(name: &str) -> &str {
    name.split_once('/').map(|(_, rest)| rest).unwrap_or(name)
}

impl Repository for MockRepository {
    fn fetch(&self, remote: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(format!("fetch {}", remote));
        match &state.fetch_error {
            Some(message) => Err(UpmergeError::command(message.clone())),
            None => Ok(()),
        }
    }

    fn status(&self) -> Result<RepoStatus> {
        Ok(self.lock().status.clone())
    }

    fn list_branches(&self) -> Result<Vec<RawBranch>> {
        let state = self.lock();
        let mut branches: Vec<RawBranch> = state
            .local_branches
            .iter()
            .map(|name| RawBranch::local(name.as_str()))
            .collect();
        branches.extend(state.branches.iter().cloned());
        Ok(branches)
    }

    fn checkout_branch(&self, name: &str, create_from: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        match create_from {
            Some(from) => {
                state.calls.push(format!("checkout -b {} {}", name, from));
                if !state.local_branches.insert(name.to_string()) {
                    return Err(UpmergeError::command(format!(
                        "a branch named '{}' already exists",
                        name
                    )));
                }
            }
            None => {
                state.calls.push(format!("checkout {}", name));
                if !state.local_branches.contains(name) {
                    return Err(UpmergeError::command(format!(
                        "pathspec '{}' did not match any branch",
                        name
                    )));
                }
            }
        }
        state.status.current = Some(name.to_string());
        Ok(())
    }

    fn merge(
        &self,
        remote: Option<&str>,
        branch: &str,
        options: &MergeOptions,
    ) -> Result<MergeSummary> {
        let mut state = self.lock();
        let source = match remote {
            Some(remote) => format!("{}/{}", remote, branch),
            None => branch.to_string(),
        };
        state.calls.push(format!("merge {}", source));

        let current = state.status.current.clone().unwrap_or_default();
        let target = target_of_temp_branch(&current);
        if state.conflicts.contains(target) {
            return Err(UpmergeError::command(format!(
                "CONFLICT (content): merge of {} into {} failed",
                source, current
            )));
        }
        if state.up_to_date.contains(target) {
            return Ok(MergeSummary {
                up_to_date: true,
                files: Vec::new(),
            });
        }

        let files = if options.list_files {
            state.merge_files.clone()
        } else {
            Vec::new()
        };
        Ok(MergeSummary {
            up_to_date: false,
            files,
        })
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(format!("push {} {}", remote, refspec));
        match &state.push_error {
            Some(message) => Err(UpmergeError::command(message.clone())),
            None => Ok(()),
        }
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(format!("delete {}", name));
        if state.status.current.as_deref() == Some(name) {
            return Err(UpmergeError::command(format!(
                "cannot delete branch '{}' checked out",
                name
            )));
        }
        if state.undeletable.contains(name) {
            return Err(UpmergeError::command(format!(
                "the branch '{}' is not fully merged",
                name
            )));
        }
        if !state.local_branches.remove(name) {
            return Err(UpmergeError::command(format!("branch '{}' not found", name)));
        }
        Ok(())
    }

    fn raw_command(&self, args: &[&str]) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(format!("raw {}", args.join(" ")));
        if args.first() == Some(&"log") {
            if let Some(range) = args.iter().find(|a| a.contains("..")) {
                return Ok(state.logs.get(*range).cloned().unwrap_or_default());
            }
        }
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_and_delete() {
        let repo = MockRepository::new("main");
        repo.checkout_branch("tmp/x", Some("origin/x")).unwrap();
        assert_eq!(repo.current_branch().as_deref(), Some("tmp/x"));

        assert!(repo.delete_branch("tmp/x").is_err());
        repo.checkout_branch("main", None).unwrap();
        repo.delete_branch("tmp/x").unwrap();
        assert_eq!(repo.local_branches(), vec!["main".to_string()]);
    }

    #[test]
    fn test_checkout_missing_branch_fails() {
        let repo = MockRepository::new("main");
        assert!(repo.checkout_branch("nope", None).is_err());
    }

    #[test]
    fn test_conflict_injection_matches_temp_branch() {
        let repo = MockRepository::new("main").with_conflict_on("release/2.0");
        repo.checkout_branch("upmerge-abc123/release/2.0", Some("origin/release/2.0"))
            .unwrap();
        let err = repo
            .merge(Some("origin"), "release/1.0", &MergeOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("CONFLICT"));
    }

    #[test]
    fn test_up_to_date_injection_matches_temp_branch() {
        let repo = MockRepository::new("main").with_up_to_date_on("release/2.0");
        repo.checkout_branch("upmerge-abc123/release/2.0", Some("origin/release/2.0"))
            .unwrap();
        let options = MergeOptions {
            list_files: true,
            ..MergeOptions::default()
        };
        let summary = repo.merge(Some("origin"), "release/1.0", &options).unwrap();
        assert!(summary.up_to_date);
        assert!(summary.files.is_empty());
    }

    #[test]
    fn test_log_lookup_by_range() {
        let repo = MockRepository::new("main").with_log("origin/b..origin/a", "line\n");
        let out = repo
            .raw_command(&["log", "--format=x", "origin/b..origin/a"])
            .unwrap();
        assert_eq!(out, "line\n");
        assert_eq!(repo.raw_command(&["log", "x..y"]).unwrap(), "");
    }

    #[test]
    fn test_calls_are_recorded() {
        let repo = MockRepository::new("main");
        repo.fetch("origin").unwrap();
        repo.push("origin", "a:b").unwrap();
        assert_eq!(repo.calls(), vec!["fetch origin", "push origin a:b"]);
    }
}
