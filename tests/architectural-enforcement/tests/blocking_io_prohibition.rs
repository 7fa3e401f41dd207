//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Code that runs on the async runtime MUST NOT block.
//! **Required**: `tokio::fs` for storage and catalog files, `tokio::io` for
//! terminal input, async `reqwest` for HTTP.
//!
//! Configuration loading happens before the runtime does any work and may
//! read its file synchronously, so `config.rs` is exempt from the file rule.

use architectural_enforcement::{all_production_lines, assert_no_violations};

const FILE_IO_EXEMPT: &[&str] = &["config.rs"];

#[test]
fn test_no_blocking_io_in_production_code() {
    let mut violations = Vec::new();

    for line in all_production_lines() {
        let file = line
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        if (line.code.contains("std::fs::") || line.code.contains("use std::fs"))
            && !FILE_IO_EXEMPT.contains(&file)
        {
            violations.push(line.report("Blocking file I/O"));
        }

        if line.code.contains("std::net::") || line.code.contains("use std::net") {
            violations.push(line.report("Blocking network I/O"));
        }

        if line.code.contains("reqwest::blocking") {
            violations.push(line.report("Blocking HTTP client"));
        }

        if line.code.contains("std::io::stdin()") || line.code.contains("read_line(") {
            violations.push(line.report("Blocking terminal input"));
        }
    }

    assert_no_violations("All I/O on the runtime must be async", &violations);
}
