use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` when a global subscriber was already installed, which
/// makes repeated calls from tests and embedding binaries harmless.
pub fn init_tracing() -> bool {
    init_tracing_with_default("info")
}

pub fn init_tracing_with_default(default_directive: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::init_tracing;

    #[test]
    fn second_initialization_is_a_no_op() {
        init_tracing();
        assert!(!init_tracing());
    }
}
