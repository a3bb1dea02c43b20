//! User tunable behavior of the core, loaded from TOML by the application.

use crate::guide::Grid;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct UndoConfig {
    /// This many undo steps are always kept, regardless of size.
    pub levels_of_undo: usize,
    /// Bytes of undo history kept beyond `levels_of_undo`.
    pub undo_size: u64,
    /// Hard cap on undo steps.
    pub max_levels: usize,
}
impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            levels_of_undo: 5,
            undo_size: 64 * 1024 * 1024,
            max_levels: 1024,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NameConfig {
    pub layer: String,
    pub group: String,
    pub channel: String,
    pub vectors: String,
    pub background: String,
}
impl Default for NameConfig {
    fn default() -> Self {
        Self {
            layer: "Layer".to_owned(),
            group: "Layer Group".to_owned(),
            channel: "Channel".to_owned(),
            vectors: "Path".to_owned(),
            background: "Background".to_owned(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub undo: UndoConfig,
    pub names: NameConfig,
    /// Grid given to new images. None leaves them without one.
    pub default_grid: Option<Grid>,
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn partial_toml_fills_defaults() {
        let config: CoreConfig = toml::from_str("[undo]\nlevels_of_undo = 2\n").unwrap();
        assert_eq!(config.undo.levels_of_undo, 2);
        assert_eq!(config.undo.max_levels, 1024);
        assert_eq!(config.names.layer, "Layer");
        assert!(config.default_grid.is_none());
    }
    #[test]
    fn round_trips() {
        let mut config = CoreConfig::default();
        config.default_grid = Some(Grid::new(16.0, 16.0));
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<CoreConfig>(&text).unwrap(), config);
    }
}
