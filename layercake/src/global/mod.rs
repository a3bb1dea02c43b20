//! Global singletons.

pub mod config;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

/// Shared user preferences, loaded once. (Or defaulted, if unavailable for some reason)
#[must_use]
pub fn preferences() -> &'static config::Preferences {
    static ONCE: std::sync::OnceLock<config::Preferences> = std::sync::OnceLock::new();
    ONCE.get_or_init(config::Preferences::load)
}
