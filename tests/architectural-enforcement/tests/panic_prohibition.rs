//! Integration Test: Panic Prohibition
//!
//! **Policy**: Production code propagates errors with `?` or recovers with
//! an explicit fallback. `.unwrap()` and `.expect(..)` belong in tests only.

use architectural_enforcement::{all_production_lines, assert_no_violations};

#[test]
fn test_no_unwrap_or_expect_in_production_code() {
    let violations: Vec<String> = all_production_lines()
        .iter()
        .filter(|line| line.code.contains(".unwrap()") || line.code.contains(".expect("))
        .map(|line| line.report("Panicking shortcut"))
        .collect();

    assert_no_violations("No unwrap()/expect() in production code", &violations);
}

#[test]
fn test_no_panic_macros_in_library() {
    let violations: Vec<String> = all_production_lines()
        .iter()
        .filter(|line| line.path.components().any(|c| c.as_os_str() == "core"))
        .filter(|line| {
            ["panic!(", "todo!(", "unimplemented!(", "unreachable!("]
                .iter()
                .any(|m| line.code.contains(m))
        })
        .map(|line| line.report("Panic macro"))
        .collect();

    assert_no_violations("No panic macros in rag-core", &violations);
}
