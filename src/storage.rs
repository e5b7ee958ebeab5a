/// Persisted settings on top of chrome.storage.local

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::filter::FilterRuleItem;
use crate::provider::ServiceProvider;
use crate::tab_data::TabColor;

pub const KEY_IS_ON: &str = "isOn";
pub const KEY_IS_AUTO_POSITION: &str = "isAutoPosition";
pub const KEY_TYPES: &str = "types";
pub const KEY_COLORS: &str = "colors";
pub const KEY_COLORS_ENABLED: &str = "colorsEnabled";
pub const KEY_PROMPT: &str = "prompt";
pub const KEY_MODEL: &str = "model";
pub const KEY_API_URL: &str = "apiURL";
pub const KEY_API_KEY: &str = "openai_key";
pub const KEY_SERVICE_PROVIDER: &str = "serviceProvider";
pub const KEY_FILTER_RULES: &str = "filterRules";

const SETTINGS_KEYS: [&str; 11] = [
    KEY_IS_ON,
    KEY_IS_AUTO_POSITION,
    KEY_TYPES,
    KEY_COLORS,
    KEY_COLORS_ENABLED,
    KEY_PROMPT,
    KEY_MODEL,
    KEY_API_URL,
    KEY_API_KEY,
    KEY_SERVICE_PROVIDER,
    KEY_FILTER_RULES,
];

pub const DEFAULT_PROMPT: &str = "Classify the tab group base on the provided URL ({{tabURL}}) and title ({{tabTitle}}) into one of the categories: {{types}}. Response with the category only, without any comments.";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_TYPES: [&str; 6] = [
    "Social",
    "Entertainment",
    "Read Material",
    "Education",
    "Productivity",
    "Utilities",
];

/// Async key-value store. `chrome.storage.local` in the extension.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }
}

/// Read a key and deserialize it. Missing keys and `null` both read as `None`.
pub async fn get_as<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::Serde {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

pub async fn set_as<T, S>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|e| StorageError::Serde {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, value).await
}

/// Every user preference, with defaults for anything never written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "isOn", default = "default_true")]
    pub is_on: bool,
    #[serde(rename = "isAutoPosition", default)]
    pub is_auto_position: bool,
    #[serde(default = "default_types")]
    pub types: Vec<String>,
    /// Parallel to `types`; entries may be empty or unknown names
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(rename = "colorsEnabled", default)]
    pub colors_enabled: bool,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "apiURL", default)]
    pub api_url: String,
    #[serde(rename = "openai_key", default)]
    pub api_key: String,
    #[serde(rename = "serviceProvider", default)]
    pub service_provider: ServiceProvider,
    #[serde(rename = "filterRules", default)]
    pub filter_rules: Vec<FilterRuleItem>,
}

fn default_true() -> bool {
    true
}

fn default_types() -> Vec<String> {
    DEFAULT_TYPES.iter().map(|t| t.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            is_on: true,
            is_auto_position: false,
            types: default_types(),
            colors: Vec::new(),
            colors_enabled: false,
            prompt: String::new(),
            model: String::new(),
            api_url: String::new(),
            api_key: String::new(),
            service_provider: ServiceProvider::default(),
            filter_rules: Vec::new(),
        }
    }
}

impl Settings {
    /// Read every settings key from the store
    pub async fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Settings, StorageError> {
        let mut object = Map::new();
        for key in SETTINGS_KEYS {
            if let Some(value) = store.get(key).await? {
                if !value.is_null() {
                    object.insert(key.to_string(), value);
                }
            }
        }

        serde_json::from_value(Value::Object(object)).map_err(|e| StorageError::Serde {
            key: "settings".to_string(),
            message: e.to_string(),
        })
    }

    /// Template to render; an empty stored prompt falls back to the default
    pub fn prompt_template(&self) -> &str {
        non_empty_or(&self.prompt, DEFAULT_PROMPT)
    }

    pub fn model_name(&self) -> &str {
        non_empty_or(&self.model, DEFAULT_MODEL)
    }

    pub fn chat_api_url(&self) -> &str {
        non_empty_or(&self.api_url, DEFAULT_API_URL)
    }

    /// User-picked color for a category, if colors are in use and one was set
    pub fn color_for(&self, category: &str) -> Option<TabColor> {
        let index = self.types.iter().position(|t| t == category)?;
        self.colors
            .get(index)
            .and_then(|name| TabColor::from_name(name))
    }

    /// Append a category unless it is already present
    pub fn add_category(&mut self, category: &str) -> bool {
        if category.is_empty() || self.types.iter().any(|t| t == category) {
            return false;
        }
        self.types.push(category.to_string());
        true
    }

    /// Rename in place, keeping position and color. Renaming onto a name
    /// that is already listed drops the old entry instead.
    pub fn rename_category(&mut self, old: &str, new: &str) -> bool {
        let Some(index) = self.types.iter().position(|t| t == old) else {
            return false;
        };
        if old == new {
            return false;
        }
        if self.types.iter().any(|t| t == new) {
            return self.remove_category(index);
        }
        self.types[index] = new.to_string();
        true
    }

    pub fn remove_category(&mut self, index: usize) -> bool {
        if index >= self.types.len() {
            return false;
        }
        self.types.remove(index);
        if index < self.colors.len() {
            self.colors.remove(index);
        }
        true
    }

    pub fn set_color(&mut self, index: usize, color: TabColor) {
        if self.colors.len() <= index {
            self.colors.resize(index + 1, String::new());
        }
        self.colors[index] = color.name().to_string();
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

pub async fn save_types<S: KeyValueStore + ?Sized>(store: &S, types: &[String]) -> Result<(), StorageError> {
    set_as(store, KEY_TYPES, types).await
}

/// One-time install migration: write defaults for keys that were never set
pub async fn seed_defaults<S: KeyValueStore + ?Sized>(store: &S) -> Result<(), StorageError> {
    let defaults: [(&str, Value); 4] = [
        (KEY_IS_ON, Value::Bool(true)),
        (KEY_IS_AUTO_POSITION, Value::Bool(false)),
        (KEY_TYPES, Value::from(default_types())),
        (KEY_PROMPT, Value::from(DEFAULT_PROMPT)),
    ];

    for (key, value) in defaults {
        if store.get(key).await?.is_none() {
            log::debug!("seeding default for {}", key);
            store.set(key, value).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RuleType;
    use crate::testing::MemoryStore;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_settings_defaults_on_empty_store() {
        let store = MemoryStore::default();

        let settings = block_on(Settings::load(&store)).unwrap();

        assert!(settings.is_on);
        assert!(!settings.is_auto_position);
        assert_eq!(settings.types, default_types());
        assert_eq!(settings.service_provider, ServiceProvider::Gpt);
        assert_eq!(settings.model_name(), "gpt-3.5-turbo");
        assert_eq!(settings.chat_api_url(), DEFAULT_API_URL);
        assert_eq!(settings.prompt_template(), DEFAULT_PROMPT);
        assert!(settings.filter_rules.is_empty());
    }

    #[test]
    fn test_settings_reads_stored_keys() {
        let store = MemoryStore::with(&[
            ("isOn", json!(false)),
            ("types", json!(["Work", "News"])),
            ("serviceProvider", json!("Gemini")),
            ("openai_key", json!("sk-test")),
            ("filterRules", json!([{"id": 1, "type": "DOMAIN", "rule": "a.com"}])),
            ("model", json!("")),
        ]);

        let settings = block_on(Settings::load(&store)).unwrap();

        assert!(!settings.is_on);
        assert_eq!(settings.types, vec!["Work", "News"]);
        assert_eq!(settings.service_provider, ServiceProvider::Gemini);
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.filter_rules[0].rule_type, RuleType::Domain);
        assert_eq!(settings.model_name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_seed_defaults_keeps_existing_values() {
        let store = MemoryStore::with(&[("types", json!(["Mine"]))]);

        block_on(seed_defaults(&store)).unwrap();

        assert_eq!(store.value("types"), Some(json!(["Mine"])));
        assert_eq!(store.value("isOn"), Some(json!(true)));
        assert_eq!(store.value("isAutoPosition"), Some(json!(false)));
        assert_eq!(store.value("prompt"), Some(json!(DEFAULT_PROMPT)));
    }

    #[test]
    fn test_add_category() {
        let mut settings = Settings::default();

        assert!(settings.add_category("Work"));
        assert!(!settings.add_category("Work"));
        assert!(!settings.add_category(""));

        assert_eq!(settings.types.last().map(String::as_str), Some("Work"));
        assert_eq!(settings.types.len(), DEFAULT_TYPES.len() + 1);
    }

    #[test]
    fn test_rename_category_in_place() {
        let mut settings = Settings::default();

        assert!(settings.rename_category("Education", "Learning"));
        assert!(!settings.rename_category("Missing", "Other"));

        assert_eq!(settings.types[3], "Learning");
        assert_eq!(settings.types.len(), DEFAULT_TYPES.len());
    }

    #[test]
    fn test_rename_onto_listed_category_merges() {
        let mut settings = Settings::default();
        settings.set_color(0, TabColor::Red);
        settings.set_color(1, TabColor::Green);

        assert!(settings.rename_category("Social", "Utilities"));

        assert_eq!(settings.types.len(), DEFAULT_TYPES.len() - 1);
        assert_eq!(settings.types.iter().filter(|t| *t == "Utilities").count(), 1);
        assert_eq!(settings.color_for("Entertainment"), Some(TabColor::Green));
        assert!(!settings.rename_category("Utilities", "Utilities"));
    }

    #[test]
    fn test_remove_category_keeps_colors_parallel() {
        let mut settings = Settings::default();
        settings.set_color(0, TabColor::Red);
        settings.set_color(2, TabColor::Blue);

        assert!(settings.remove_category(0));
        assert!(!settings.remove_category(99));

        assert_eq!(settings.types[0], "Entertainment");
        assert_eq!(settings.color_for("Entertainment"), None);
        assert_eq!(settings.color_for("Read Material"), Some(TabColor::Blue));
    }

    #[test]
    fn test_get_as_treats_null_as_missing() {
        let store = MemoryStore::with(&[("openai_key", Value::Null)]);

        let key: Option<String> = block_on(get_as(&store, "openai_key")).unwrap();

        assert_eq!(key, None);
    }

    #[test]
    fn test_serialization() {
        let mut settings = Settings::default();
        settings.api_key = "k".to_string();

        let json = serde_json::to_value(&settings).unwrap();

        assert_eq!(json["openai_key"], json!("k"));
        assert_eq!(json["serviceProvider"], json!("GPT"));
        assert_eq!(json["isAutoPosition"], json!(false));
    }
}
