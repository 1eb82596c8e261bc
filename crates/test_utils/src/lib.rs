//! Test utilities to be used in rquery tests.

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Build an entity fragment from a json object literal.
///
/// Panics if `value` is not an object.
pub fn fragment(
    value: serde_json::Value,
) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        oth => panic!("expected a json object, got {oth}"),
    }
}

/// Repeatedly run a block until it breaks or returns, sleeping in between.
///
/// Panics if the timeout elapses first.
///
/// - `iter_check!(timeout_ms, sleep_ms, { .. })`
/// - `iter_check!(timeout_ms, { .. })` - sleeps 1 ms between checks.
/// - `iter_check!({ .. })` - times out after 1000 ms.
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:literal, $sleep_ms:literal, $code:block) => {
        tokio::time::timeout(
            std::time::Duration::from_millis($timeout_ms),
            async {
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        $sleep_ms,
                    ))
                    .await;
                    $code
                }
            },
        )
        .await
        .expect("iter_check timed out")
    };
    ($timeout_ms:literal, $code:block) => {
        $crate::iter_check!($timeout_ms, 1, $code)
    };
    ($code:block) => {
        $crate::iter_check!(1000, $code)
    };
}
