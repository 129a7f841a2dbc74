use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Store for the editable-products registry value.
///
/// The registry records which product groups have been set up as
/// editable, as a single space-delimited string. Keeping the store
/// behind this trait lets tests substitute an in-memory fake for the
/// user config file.
pub trait EditableProductsStore {
    fn get(&self) -> Result<Option<String>>;
    fn set(&mut self, value: &str) -> Result<()>;
}

/// Add `group` to the registry, keeping the stored value sorted,
/// space-delimited, and de-duplicated.
///
/// Returns whether the registry changed; re-registering a known group is
/// a no-op.
pub fn register_group(store: &mut dyn EditableProductsStore, group: &str) -> Result<bool> {
    let current = store.get()?;
    let mut groups: BTreeSet<String> = current
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    if !groups.insert(group.to_string()) {
        return Ok(false);
    }

    let joined = groups.into_iter().collect::<Vec<_>>().join(" ");
    store.set(&joined)?;
    Ok(true)
}

/// User config file layout. Only `test.editable_products` is ours;
/// unrelated sections and keys are preserved across rewrites.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test: Option<TestSection>,
    #[serde(flatten)]
    rest: toml::Table,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TestSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    editable_products: Option<String>,
    #[serde(flatten)]
    rest: toml::Table,
}

/// File-backed store over the user config (`$XDG_CONFIG_HOME/wst/config.toml`).
///
/// Read-modify-write without locking; concurrent runs against the same
/// workspace are unsupported.
#[derive(Debug)]
pub struct UserConfigStore {
    path: PathBuf,
}

impl UserConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<UserConfig> {
        if !self.path.exists() {
            return Ok(UserConfig::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read user config {:?}", self.path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse user config {:?}", self.path))
    }

    fn save(&self, config: &UserConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(config).context("Failed to serialize user config")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write user config {:?}", self.path))?;
        Ok(())
    }
}

impl EditableProductsStore for UserConfigStore {
    fn get(&self) -> Result<Option<String>> {
        let config = self.load()?;
        Ok(config.test.and_then(|t| t.editable_products))
    }

    fn set(&mut self, value: &str) -> Result<()> {
        let mut config = self.load()?;
        config
            .test
            .get_or_insert_with(TestSection::default)
            .editable_products = Some(value.to_string());
        self.save(&config)
    }
}

/// In-memory store used by tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    pub value: Option<String>,
}

#[cfg(test)]
impl EditableProductsStore for MemoryStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.value.clone())
    }

    fn set(&mut self, value: &str) -> Result<()> {
        self.value = Some(value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_register_group_from_empty() {
        let mut store = MemoryStore::default();

        assert!(register_group(&mut store, "backend").unwrap());
        assert_eq!(store.value.as_deref(), Some("backend"));
    }

    #[test]
    fn test_register_group_sorts_and_joins() {
        let mut store = MemoryStore {
            value: Some("frontend".to_string()),
        };

        assert!(register_group(&mut store, "backend").unwrap());
        assert_eq!(store.value.as_deref(), Some("backend frontend"));
    }

    #[test]
    fn test_register_group_idempotent() {
        let mut store = MemoryStore {
            value: Some("backend frontend".to_string()),
        };

        assert!(!register_group(&mut store, "backend").unwrap());
        assert_eq!(store.value.as_deref(), Some("backend frontend"));
    }

    #[test]
    fn test_user_config_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut store = UserConfigStore::new(temp.path().join("config.toml"));

        assert_eq!(store.get().unwrap(), None);

        store.set("backend").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("backend"));

        register_group(&mut store, "api").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("api backend"));
    }

    #[test]
    fn test_user_config_store_preserves_other_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[checkout]\nuser_remote = \"origin\"\n\n[test]\nrunner = \"pytest\"\n",
        )
        .unwrap();

        let mut store = UserConfigStore::new(path.clone());
        store.set("backend").unwrap();

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("editable_products"));
        assert!(rewritten.contains("user_remote"));
        assert!(rewritten.contains("runner"));
        assert_eq!(store.get().unwrap().as_deref(), Some("backend"));
    }
}
