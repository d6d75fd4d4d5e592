//! Custom macros for reducing code repetition in marquee

/// Log an error and continue execution (non-fatal error handling)
///
/// # Example
/// ```ignore
/// log_and_continue!(engine.set_volume(volume), "apply volume");
/// ```
#[macro_export]
macro_rules! log_and_continue {
    ($expr:expr, $context:expr) => {
        if let Err(e) = $expr {
            log::error!("Failed to {}: {}", $context, e);
        }
    };
}

/// Validate an enum-like string value
///
/// # Example
/// ```ignore
/// validate_enum!(backend, "simulated", "gstreamer");
/// validate_enum!(log_level, "trace", "debug", "info", "warn", "error");
/// ```
#[macro_export]
macro_rules! validate_enum {
    ($value:expr, $($variant:expr),+) => {
        match $value {
            $($variant)|+ => Ok::<(), anyhow::Error>(()),
            _ => Err(anyhow::anyhow!(
                "Invalid value: {} (expected one of: {})",
                $value,
                [$($variant),+].join(", ")
            )),
        }
    };
}
