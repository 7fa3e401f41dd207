//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep. Periodic work runs on
//! `tokio::time::interval`; waiting for results uses the result itself.
//! Sleeps in tests are fine (paused-time tests rely on them).

use architectural_enforcement::{all_production_lines, assert_no_violations};

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<String> = all_production_lines()
        .iter()
        .filter(|line| line.code.contains("thread::sleep") || line.code.contains("time::sleep"))
        .map(|line| line.report("Sleep call"))
        .collect();

    assert_no_violations("No sleep() in production code; use tokio::time::interval", &violations);
}
