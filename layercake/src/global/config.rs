use layercake_core::config::CoreConfig;

const DOCUMENTATION: &str = r#"# Layercake preferences. You may edit this file, but be aware that formatting and comments will
# not be preserved, and all keys are case sensitive. Missing keys take their default value.

# [core.undo]
# levels_of_undo: undo steps that are always kept.
# undo_size: bytes of history kept beyond that.
# max_levels: hard cap on undo steps.
#
# [core.names]
# Default names of new layers, groups, channels and paths.
#
# data_dir: where palettes, patterns, gradients, brushes, dynamics and templates are loaded from.
# Defaults to a "data" folder next to this file.

"#;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub data_dir: Option<std::path::PathBuf>,
    pub core: CoreConfig,
    #[serde(skip)]
    failed_to_load: bool,
}
impl Preferences {
    const FILENAME: &'static str = "config.toml";
    #[must_use]
    pub fn path() -> Option<std::path::PathBuf> {
        let mut dir = super::preferences_dir()?;
        dir.push(Self::FILENAME);
        Some(dir)
    }
    #[must_use]
    pub fn load() -> Self {
        match Self::path() {
            None => Self::no_path(),
            Some(path) => Self::load_or_default(&path),
        }
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Preferences weren't available, defaulting.");
        Self {
            failed_to_load: true,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        let preferences: anyhow::Result<Self> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let preferences: Self = toml::from_str(&string)?;
            Ok(preferences)
        };
        match preferences {
            Ok(preferences) => preferences,
            Err(e) => {
                log::debug!("failed to read {}: {e}", path.display());
                Self::no_path()
            }
        }
    }
    /// Return true if loading user's settings failed.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    /// The configured data directory, or `data` beside the preferences.
    #[must_use]
    pub fn data_dir(&self) -> Option<std::path::PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| super::preferences_dir().map(|dir| dir.join("data")))
    }
    pub fn save(&self) -> anyhow::Result<std::path::PathBuf> {
        let mut preferences =
            super::preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(&preferences, string)?;
        Ok(preferences)
    }
}
