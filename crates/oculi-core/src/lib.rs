// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
mod error;
mod quit;

pub use error::SetupError;
pub use quit::QuitFlag;

pub fn init_tracing() {
    init_tracing_with(None);
}

/// Like [`init_tracing`], but `filter` (same syntax as `RUST_LOG`) wins over the environment.
pub fn init_tracing_with(filter: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};
    let env_filter = match filter.map(EnvFilter::try_new) {
        Some(Ok(f)) => f,
        _ => EnvFilter::from_default_env(),
    };
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_init_is_repeatable() {
        init_tracing_with(Some("oculi=trace"));
        init_tracing_with(Some("not a [valid filter"));
        init_tracing();
    }
}
