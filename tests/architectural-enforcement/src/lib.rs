//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleeps in production code (timers are `tokio::time::interval`)
//! - All I/O on the request path is async
//! - No panicking shortcuts (`unwrap`/`expect`) in production code
//!
//! The helpers below give each test the production lines of every Rust file
//! under the checked crates. A file's production code ends at its first
//! `#[cfg(test)]`; comment-only lines and trailing comments are dropped.

use std::fs;
use std::path::{Path, PathBuf};

/// Source roots checked by every rule, relative to the workspace root
pub const PRODUCTION_ROOTS: &[&str] = &["rag/core/src", "rag/chat/src"];

/// One line of production code
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File the line belongs to
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Code with any trailing `//` comment removed
    pub code: String,
}

impl SourceLine {
    /// `path:line - reason: code`, for violation reports
    #[must_use]
    pub fn report(&self, reason: &str) -> String {
        format!(
            "{}:{} - {reason}: {}",
            self.path.display(),
            self.number,
            self.code.trim()
        )
    }
}

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Production lines of one file
#[must_use]
pub fn production_lines(path: &Path) -> Vec<SourceLine> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .filter_map(|(idx, line)| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") {
                return None;
            }
            let code = line.split("//").next().unwrap_or(line);
            Some(SourceLine {
                path: path.to_path_buf(),
                number: idx + 1,
                code: code.to_string(),
            })
        })
        .collect()
}

/// Production lines of every file under every [`PRODUCTION_ROOTS`] entry
#[must_use]
pub fn all_production_lines() -> Vec<SourceLine> {
    PRODUCTION_ROOTS
        .iter()
        .flat_map(|root| rust_files(root))
        .flat_map(|path| production_lines(&path))
        .collect()
}

/// Print violations and fail the test when there are any
///
/// # Panics
///
/// When `violations` is not empty.
pub fn assert_no_violations(rule: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) of: {rule}\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_exist() {
        for root in PRODUCTION_ROOTS {
            assert!(
                !rust_files(root).is_empty(),
                "no Rust files found under {root}"
            );
        }
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let dir = std::env::temp_dir().join("arch-enforcement-selftest");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(
            &file,
            "fn a() {}\n// note\nlet x = 1; // trailing\n#[cfg(test)]\nmod tests {}\n",
        )
        .unwrap();

        let lines = production_lines(&file);
        let codes: Vec<&str> = lines.iter().map(|l| l.code.trim()).collect();
        assert_eq!(codes, vec!["fn a() {}", "let x = 1;"]);
        assert_eq!(lines[1].number, 3);
    }
}
