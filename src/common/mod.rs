use tracing_subscriber::EnvFilter;

/// One-time setup for in-crate tests: eyre reports for panics and tracing
/// output captured by the test harness (enable with RUST_LOG).
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        color_eyre::install().unwrap();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
