use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Workspace configuration file, looked up in the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = "workspace.toml";

/// Workspace configuration (`workspace.toml`)
///
/// ```toml
/// [groups]
/// backend = ["https://git.example.com/org/svc-a.git", "svc-b"]
///
/// [develop]
/// command = "tox"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceConfig {
    /// Optional workspace root override; supports `~` expansion.
    #[serde(default)]
    pub root: Option<String>,
    /// Product group definitions: group name -> ordered member list.
    /// Members are product identifiers (git URLs or bare names) and may
    /// name other groups.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub develop: DevelopConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevelopConfig {
    /// Base command used to develop a product environment. Flags for
    /// redevelop (`-r`) and install-only (`--notest`) are appended.
    pub command: String,
}

impl Default for DevelopConfig {
    fn default() -> Self {
        Self {
            command: "tox".to_string(),
        }
    }
}

impl WorkspaceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read workspace config {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse workspace config {:?}", path))
    }
}

/// Workspace - the directory that holds all product checkouts
///
/// Commands are run from the workspace root (never from inside a product
/// repo); products are checked out into `<root>/<product name>`.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
}

impl Workspace {
    /// Discover the workspace rooted at the current directory.
    pub fn discover() -> Result<Self> {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        Self::at(&cwd)
    }

    /// Open the workspace rooted at `dir`, honoring a `root` override in
    /// its configuration.
    pub fn at(dir: &Path) -> Result<Self> {
        let config = WorkspaceConfig::load(&dir.join(WORKSPACE_CONFIG_FILE))?;

        let root = match &config.root {
            Some(root) => PathBuf::from(shellexpand::tilde(root).into_owned()),
            None => dir.to_path_buf(),
        };

        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Whether `name` is a configured product group.
    pub fn has_group(&self, name: &str) -> bool {
        self.config.groups.contains_key(name)
    }

    /// Local checkout path for a product name.
    pub fn product_path(&self, product: &str) -> PathBuf {
        self.root.join(product)
    }

    /// Expand product groups among `targets` into a flat, ordered,
    /// de-duplicated product list.
    ///
    /// Group members may name other groups; expansion recurses with
    /// cycle protection. Targets that are not group names pass through
    /// as products.
    pub fn expand_product_groups(&self, targets: &[String]) -> Result<Vec<String>> {
        let mut products = Vec::new();
        let mut seen = HashSet::new();
        let mut expanding = HashSet::new();

        for target in targets {
            self.expand_target(target, &mut products, &mut seen, &mut expanding);
        }

        Ok(products)
    }

    fn expand_target(
        &self,
        target: &str,
        products: &mut Vec<String>,
        seen: &mut HashSet<String>,
        expanding: &mut HashSet<String>,
    ) {
        if let Some(members) = self.config.groups.get(target) {
            // Cycle: a group reached while already expanding it is skipped.
            if !expanding.insert(target.to_string()) {
                tracing::warn!("Product group \"{}\" contains itself; skipping cycle", target);
                return;
            }
            for member in members {
                self.expand_target(member, products, seen, expanding);
            }
            expanding.remove(target);
        } else if seen.insert(target.to_string()) {
            products.push(target.to_string());
        }
    }

    /// Path to the user-scoped config file: `$XDG_CONFIG_HOME/wst/config.toml`
    /// (default: `~/.config/wst/config.toml`).
    pub fn user_config_path() -> Result<PathBuf> {
        let base = env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| -> Result<PathBuf> {
                Ok(directories::BaseDirs::new()
                    .context("Could not determine home directory")?
                    .home_dir()
                    .join(".config"))
            })?;

        Ok(base.join("wst").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn workspace_with(groups: &str) -> (TempDir, Workspace) {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(WORKSPACE_CONFIG_FILE), groups).unwrap();
        let workspace = Workspace::at(temp.path()).unwrap();
        (temp, workspace)
    }

    #[test]
    fn test_missing_config_is_default() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path()).unwrap();

        assert_eq!(workspace.root(), temp.path());
        assert!(workspace.config().groups.is_empty());
        assert_eq!(workspace.config().develop.command, "tox");
    }

    #[test]
    fn test_load_groups() {
        let (_temp, workspace) = workspace_with(
            r#"
            [groups]
            backend = ["svc-a", "svc-b"]
            all = ["backend", "frontend"]
            "#,
        );

        assert!(workspace.has_group("backend"));
        assert!(workspace.has_group("all"));
        assert!(!workspace.has_group("svc-a"));
    }

    #[test]
    fn test_expand_passes_products_through() {
        let (_temp, workspace) = workspace_with("[groups]\nbackend = [\"svc-a\"]\n");

        let expanded = workspace
            .expand_product_groups(&["svc-z".to_string()])
            .unwrap();
        assert_eq!(expanded, vec!["svc-z"]);
    }

    #[test]
    fn test_expand_recursive_groups() {
        let (_temp, workspace) = workspace_with(
            r#"
            [groups]
            backend = ["svc-a", "svc-b"]
            all = ["backend", "web"]
            "#,
        );

        let expanded = workspace
            .expand_product_groups(&["all".to_string()])
            .unwrap();
        assert_eq!(expanded, vec!["svc-a", "svc-b", "web"]);
    }

    #[test]
    fn test_expand_deduplicates_preserving_order() {
        let (_temp, workspace) = workspace_with(
            r#"
            [groups]
            backend = ["svc-a", "svc-b"]
            all = ["backend", "svc-a", "web"]
            "#,
        );

        let expanded = workspace
            .expand_product_groups(&["all".to_string()])
            .unwrap();
        assert_eq!(expanded, vec!["svc-a", "svc-b", "web"]);
    }

    #[test]
    fn test_expand_cycle_terminates() {
        let (_temp, workspace) = workspace_with(
            r#"
            [groups]
            a = ["b", "svc-a"]
            b = ["a", "svc-b"]
            "#,
        );

        let expanded = workspace.expand_product_groups(&["a".to_string()]).unwrap();
        assert_eq!(expanded, vec!["svc-b", "svc-a"]);
    }

    #[test]
    fn test_root_override() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(WORKSPACE_CONFIG_FILE),
            "root = \"/tmp/elsewhere\"\n",
        )
        .unwrap();

        let workspace = Workspace::at(temp.path()).unwrap();
        assert_eq!(workspace.root(), Path::new("/tmp/elsewhere"));
        assert_eq!(
            workspace.product_path("svc-a"),
            Path::new("/tmp/elsewhere/svc-a")
        );
    }

    #[test]
    #[serial]
    fn test_user_config_path_respects_xdg() {
        let temp = TempDir::new().unwrap();
        env::set_var("XDG_CONFIG_HOME", temp.path());

        let path = Workspace::user_config_path().unwrap();
        assert_eq!(path, temp.path().join("wst/config.toml"));

        env::remove_var("XDG_CONFIG_HOME");
    }
}
