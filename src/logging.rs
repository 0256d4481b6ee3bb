//! Logger setup. Everything in the crate logs through the `log` facade; this
//! picks the backend for the platform.

use std::sync::Once;

/// Tag the bridge logs under in logcat.
pub const LOG_TAG: &str = "PawnCompiler";

static INIT: Once = Once::new();

/// Install the platform logger. Safe to call more than once; only the first
/// call has any effect, and an already-installed logger is left alone.
pub fn init() {
    INIT.call_once(install);
}

#[cfg(target_os = "android")]
fn install() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_tag(LOG_TAG)
            .with_max_level(log::LevelFilter::Info),
    );
}

#[cfg(not(target_os = "android"))]
fn install() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .try_init();
    log::debug!("{LOG_TAG} logging initialized");
}
