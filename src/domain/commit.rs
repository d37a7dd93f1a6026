use crate::error::{Result, UpmergeError};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;

/// Separator between fields of one log record (ASCII unit separator)
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// `git log` format producing one parseable record per line:
/// hash, author name, author email, ISO author date, subject
pub const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%aI%x1f%s";

const FIELD_COUNT: usize = 5;

/// A commit found in a `target..source` range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub date: DateTime<FixedOffset>,
    pub message: String,
}

impl CommitInfo {
    /// Abbreviated hash for display
    pub fn short_hash(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }

    /// Parse one record produced by [`LOG_FORMAT`]
    pub fn parse_log_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.splitn(FIELD_COUNT, FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(UpmergeError::log_parse(format!(
                "expected {} fields, found {} in line {:?}",
                FIELD_COUNT,
                fields.len(),
                line
            )));
        }

        let hash = fields[0].trim();
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UpmergeError::log_parse(format!(
                "invalid commit hash {:?}",
                fields[0]
            )));
        }

        let date = DateTime::parse_from_rfc3339(fields[3]).map_err(|e| {
            UpmergeError::log_parse(format!("invalid date {:?} for {}: {}", fields[3], hash, e))
        })?;

        Ok(CommitInfo {
            hash: hash.to_string(),
            author_name: fields[1].to_string(),
            author_email: fields[2].to_string(),
            date,
            message: fields[4].to_string(),
        })
    }
}

/// Parse the full output of a range query. Blank lines are skipped; any
/// other unparseable line fails the whole call.
pub fn parse_log(output: &str) -> Result<Vec<CommitInfo>> {
    let mut commits = Vec::new();
    for (index, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            tracing::debug!(line = index + 1, "skipping blank log line");
            continue;
        }
        commits.push(CommitInfo::parse_log_line(line)?);
    }
    Ok(commits)
}

/// Commits per author, grouped by email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
    pub commit_count: usize,
}

/// Group commits by author email (case-insensitive).
///
/// Each author keeps the first name seen for that email. Authors are
/// ordered by descending commit count, then by email.
pub fn group_by_author(commits: &[CommitInfo]) -> Vec<AuthorInfo> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut authors: Vec<AuthorInfo> = Vec::new();

    for commit in commits {
        let key = commit.author_email.to_lowercase();
        match index.get(&key) {
            Some(&i) => authors[i].commit_count += 1,
            None => {
                index.insert(key, authors.len());
                authors.push(AuthorInfo {
                    name: commit.author_name.clone(),
                    email: commit.author_email.clone(),
                    commit_count: 1,
                });
            }
        }
    }

    authors.sort_by(|a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then_with(|| a.email.to_lowercase().cmp(&b.email.to_lowercase()))
    });
    authors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(hash: &str, name: &str, email: &str, subject: &str) -> String {
        format!(
            "{hash}\u{1f}{name}\u{1f}{email}\u{1f}2024-03-01T10:15:00+01:00\u{1f}{subject}"
        )
    }

    fn commit(hash: &str, name: &str, email: &str) -> CommitInfo {
        CommitInfo::parse_log_line(&line(hash, name, email, "fix")).unwrap()
    }

    #[test]
    fn test_parse_log_line() {
        let c = CommitInfo::parse_log_line(&line(
            "0123456789abcdef",
            "Ada Lovelace",
            "ada@example.com",
            "Fix overflow in parser",
        ))
        .unwrap();
        assert_eq!(c.hash, "0123456789abcdef");
        assert_eq!(c.short_hash(), "01234567");
        assert_eq!(c.author_name, "Ada Lovelace");
        assert_eq!(c.author_email, "ada@example.com");
        assert_eq!(c.message, "Fix overflow in parser");
        assert_eq!(c.date.to_rfc3339(), "2024-03-01T10:15:00+01:00");
    }

    #[test]
    fn test_subject_may_contain_separator() {
        let c = CommitInfo::parse_log_line(&line("abc", "A", "a@x", "odd\u{1f}subject")).unwrap();
        assert_eq!(c.message, "odd\u{1f}subject");
    }

    #[test]
    fn test_wrong_field_count_is_error() {
        let err = CommitInfo::parse_log_line("abc\u{1f}name only").unwrap_err();
        assert!(matches!(err, UpmergeError::LogParse(_)));
    }

    #[test]
    fn test_bad_date_is_error() {
        let err = CommitInfo::parse_log_line("abc\u{1f}A\u{1f}a@x\u{1f}yesterday\u{1f}msg")
            .unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }

    #[test]
    fn test_bad_hash_is_error() {
        assert!(CommitInfo::parse_log_line(&line("not-a-hash", "A", "a@x", "m")).is_err());
    }

    #[test]
    fn test_parse_log_skips_blank_lines() {
        let output = format!("{}\n\n{}\n", line("aa", "A", "a@x", "one"), line("bb", "B", "b@x", "two"));
        let commits = parse_log(&output).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].message, "two");
    }

    #[test]
    fn test_parse_log_fails_on_malformed_line() {
        let output = format!("{}\ngarbage\n", line("aa", "A", "a@x", "one"));
        assert!(parse_log(&output).is_err());
    }

    #[test]
    fn test_group_by_author_counts_and_orders() {
        let commits = vec![
            commit("01", "Bob", "bob@x"),
            commit("02", "Alice", "alice@x"),
            commit("03", "Bobby", "BOB@x"),
            commit("04", "Carol", "carol@x"),
        ];
        let authors = group_by_author(&commits);

        assert_eq!(authors.len(), 3);
        assert_eq!(authors[0].name, "Bob");
        assert_eq!(authors[0].commit_count, 2);
        assert_eq!(authors[1].email, "alice@x");
        assert_eq!(authors[2].email, "carol@x");
    }

    #[test]
    fn test_group_by_author_empty() {
        assert!(group_by_author(&[]).is_empty());
    }
}
