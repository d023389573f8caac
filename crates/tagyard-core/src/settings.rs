//! Per-dataset settings, persisted as strings in the dataset store.
//!
//! Every knob a run uses is stored per folder, so reopening a dataset
//! reproduces the last run exactly. Unknown or unparsable stored values fall
//! back to the supplied defaults with a warning rather than failing a run.

use crate::error::StoreError;
use crate::store::DatasetStore;
use crate::threshold::ThresholdOptions;
use crate::transform::TagRules;

/// Default tagging model identity.
pub const DEFAULT_MODEL: &str = "SmilingWolf/wd-eva02-large-tagger-v3";

/// All run-affecting settings for one dataset folder.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSettings {
    pub model: String,
    pub general_threshold: f32,
    pub general_mcut: bool,
    pub character_threshold: f32,
    pub character_mcut: bool,
    pub replace_underscores: bool,
    pub trim_general_tag_dupes: bool,
    pub escape_brackets: bool,
    pub overwrite_captions: bool,
    /// Stored string forms of the rule fields (comma lists, map rules one
    /// per line). Parsed into [`TagRules`] on demand.
    pub prefix_tags: String,
    pub keep_tags: String,
    pub ban_tags: String,
    pub map_tags: String,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            general_threshold: 0.35,
            general_mcut: false,
            character_threshold: 0.85,
            character_mcut: false,
            replace_underscores: true,
            trim_general_tag_dupes: true,
            escape_brackets: false,
            overwrite_captions: false,
            prefix_tags: String::new(),
            keep_tags: String::new(),
            ban_tags: String::new(),
            map_tags: String::new(),
        }
    }
}

impl DatasetSettings {
    /// Load settings for a folder, layering stored values over `defaults`.
    pub fn load(
        store: &dyn DatasetStore,
        folder: &str,
        defaults: &DatasetSettings,
    ) -> Result<Self, StoreError> {
        let mut settings = defaults.clone();

        if let Some(v) = store.get_setting(folder, "model")? {
            settings.model = v;
        }
        load_f32(store, folder, "general_threshold", &mut settings.general_threshold)?;
        load_bool(store, folder, "general_mcut", &mut settings.general_mcut)?;
        load_f32(store, folder, "character_threshold", &mut settings.character_threshold)?;
        load_bool(store, folder, "character_mcut", &mut settings.character_mcut)?;
        load_bool(store, folder, "replace_underscores", &mut settings.replace_underscores)?;
        load_bool(store, folder, "trim_general_tag_dupes", &mut settings.trim_general_tag_dupes)?;
        load_bool(store, folder, "escape_brackets", &mut settings.escape_brackets)?;
        load_bool(store, folder, "overwrite_captions", &mut settings.overwrite_captions)?;
        load_string(store, folder, "prefix_tags", &mut settings.prefix_tags)?;
        load_string(store, folder, "keep_tags", &mut settings.keep_tags)?;
        load_string(store, folder, "ban_tags", &mut settings.ban_tags)?;
        load_string(store, folder, "map_tags", &mut settings.map_tags)?;

        Ok(settings)
    }

    /// Persist every setting for the folder.
    pub fn save(&self, store: &dyn DatasetStore, folder: &str) -> Result<(), StoreError> {
        store.set_setting(folder, "model", &self.model)?;
        store.set_setting(folder, "general_threshold", &self.general_threshold.to_string())?;
        store.set_setting(folder, "general_mcut", bool_str(self.general_mcut))?;
        store.set_setting(folder, "character_threshold", &self.character_threshold.to_string())?;
        store.set_setting(folder, "character_mcut", bool_str(self.character_mcut))?;
        store.set_setting(folder, "replace_underscores", bool_str(self.replace_underscores))?;
        store.set_setting(
            folder,
            "trim_general_tag_dupes",
            bool_str(self.trim_general_tag_dupes),
        )?;
        store.set_setting(folder, "escape_brackets", bool_str(self.escape_brackets))?;
        store.set_setting(folder, "overwrite_captions", bool_str(self.overwrite_captions))?;
        store.set_setting(folder, "prefix_tags", &self.prefix_tags)?;
        store.set_setting(folder, "keep_tags", &self.keep_tags)?;
        store.set_setting(folder, "ban_tags", &self.ban_tags)?;
        store.set_setting(folder, "map_tags", &self.map_tags)?;
        Ok(())
    }

    pub fn general_options(&self) -> ThresholdOptions {
        ThresholdOptions {
            threshold: self.general_threshold,
            use_mcut: self.general_mcut,
        }
    }

    pub fn character_options(&self) -> ThresholdOptions {
        ThresholdOptions {
            threshold: self.character_threshold,
            use_mcut: self.character_mcut,
        }
    }

    /// Build the transform rule set from the stored rule text.
    pub fn tag_rules(&self) -> TagRules {
        TagRules {
            replace_underscores: self.replace_underscores,
            trim_general_tag_dupes: self.trim_general_tag_dupes,
            escape_brackets: self.escape_brackets,
            ..TagRules::default()
        }
        .with_rule_text(&self.prefix_tags, &self.keep_tags, &self.ban_tags, &self.map_tags)
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn load_string(
    store: &dyn DatasetStore,
    folder: &str,
    key: &str,
    slot: &mut String,
) -> Result<(), StoreError> {
    if let Some(v) = store.get_setting(folder, key)? {
        *slot = v;
    }
    Ok(())
}

fn load_bool(
    store: &dyn DatasetStore,
    folder: &str,
    key: &str,
    slot: &mut bool,
) -> Result<(), StoreError> {
    if let Some(v) = store.get_setting(folder, key)? {
        match v.as_str() {
            "true" => *slot = true,
            "false" => *slot = false,
            other => tracing::warn!("Ignoring stored setting {key}={other:?}, expected a bool"),
        }
    }
    Ok(())
}

fn load_f32(
    store: &dyn DatasetStore,
    folder: &str,
    key: &str,
    slot: &mut f32,
) -> Result<(), StoreError> {
    if let Some(v) = store.get_setting(folder, key)? {
        match v.parse::<f32>() {
            Ok(parsed) => *slot = parsed,
            Err(_) => tracing::warn!("Ignoring stored setting {key}={v:?}, expected a number"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[test]
    fn load_without_stored_values_returns_defaults() {
        let store = SqliteStore::open_in_memory().unwrap();
        let defaults = DatasetSettings::default();
        let loaded = DatasetSettings::load(&store, "/data", &defaults).unwrap();
        assert_eq!(loaded, defaults);
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let settings = DatasetSettings {
            model: "Example/other-model".to_string(),
            general_threshold: 0.5,
            general_mcut: true,
            character_threshold: 0.7,
            character_mcut: false,
            replace_underscores: false,
            trim_general_tag_dupes: false,
            escape_brackets: true,
            overwrite_captions: true,
            prefix_tags: "masterpiece".to_string(),
            keep_tags: "keep_me".to_string(),
            ban_tags: "lowres, watermark".to_string(),
            map_tags: "2girl : 2girls".to_string(),
        };

        settings.save(&store, "/data").unwrap();
        let loaded = DatasetSettings::load(&store, "/data", &DatasetSettings::default()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn settings_are_scoped_per_folder() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut settings = DatasetSettings::default();
        settings.general_threshold = 0.11;
        settings.save(&store, "/a").unwrap();

        let other = DatasetSettings::load(&store, "/b", &DatasetSettings::default()).unwrap();
        assert_eq!(other.general_threshold, DatasetSettings::default().general_threshold);
    }

    #[test]
    fn malformed_stored_values_fall_back_to_defaults() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_setting("/data", "general_threshold", "not a number").unwrap();
        store.set_setting("/data", "general_mcut", "maybe").unwrap();

        let loaded = DatasetSettings::load(&store, "/data", &DatasetSettings::default()).unwrap();
        assert_eq!(loaded, DatasetSettings::default());
    }

    #[test]
    fn fresh_dataset_trims_dupes_and_leaves_brackets_alone() {
        let rules = DatasetSettings::default().tag_rules();
        assert!(rules.trim_general_tag_dupes);
        assert!(!rules.escape_brackets);
        assert!(rules.replace_underscores);
    }

    #[test]
    fn tag_rules_reflect_rule_text() {
        let settings = DatasetSettings {
            ban_tags: "watermark".to_string(),
            map_tags: "2girl : 2girls".to_string(),
            ..DatasetSettings::default()
        };
        let rules = settings.tag_rules();
        assert!(rules.ban_tags.contains("watermark"));
        assert_eq!(rules.map_tags.len(), 1);
        assert!(rules.replace_underscores);
    }
}
