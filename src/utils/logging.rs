use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. `log_level` is an `EnvFilter` directive;
/// an invalid one falls back to `info`. rumqttc is capped at `warn` unless the
/// directive names it explicitly.
pub fn init_tracing(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .or_else(|_| EnvFilter::try_new(filter_directive("info")))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}

fn filter_directive(log_level: &str) -> String {
    if log_level.contains("rumqttc") {
        log_level.to_string()
    } else {
        format!("{},rumqttc=warn", log_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rumqttc_is_quieted_by_default() {
        assert_eq!(filter_directive("debug"), "debug,rumqttc=warn");
    }

    #[test]
    fn explicit_rumqttc_directive_is_kept() {
        assert_eq!(filter_directive("info,rumqttc=trace"), "info,rumqttc=trace");
    }
}
