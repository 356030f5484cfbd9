use jarvis::setup_logging;

#[test]
fn test_logging_setup() {
    // Verifies that logging setup doesn't panic; a second init in the same
    // process would, so this is the only test in this file.
    let result = std::panic::catch_unwind(|| {
        setup_logging(false);
    });

    assert!(result.is_ok(), "setup_logging should not panic");
}
