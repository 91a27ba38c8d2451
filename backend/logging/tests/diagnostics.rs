//! Kept in its own test binary: installing a global subscriber would clash
//! with `#[traced_test]` in the unit tests.

use beatlog::init_diagnostics;

#[test]
fn unusable_directory_and_repeated_init_are_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("plain");
    std::fs::write(&not_a_dir, "x").unwrap();

    init_diagnostics("warn", Some(&not_a_dir));
    init_diagnostics("warn", Some(dir.path()));
    init_diagnostics("debug", None);
    tracing::warn!(component = "test", "diagnostics installed");
}
