/// The fmt subscriber's default features already install the log crate
/// bridge during init, so startup must not call `LogTracer::init` itself;
/// the second install would fail and abort the binary.
#[test]
fn test_subscriber_init_already_bridges_the_log_crate() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .expect("first init in this process");

    assert!(
        tracing_log::LogTracer::init().is_err(),
        "a second logger install must be rejected"
    );
}
