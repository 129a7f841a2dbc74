use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-product settings file name, at the repository root or in a
/// nested product subdirectory.
pub const SETTINGS_FILE: &str = "setup.cfg";

/// Setup scripts and environment exports declared by one product.
///
/// Parsed from the `[scripts]` and `[exports]` sections of the
/// product's `setup.cfg`; all other sections are ignored. Section and
/// key names are case-sensitive and kept untransformed, and declaration
/// order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductSettings {
    /// Named shell snippets, run once per setup with the product repo
    /// root as working directory.
    pub scripts: Vec<(String, String)>,
    /// Environment variable assignments, merged across the group.
    pub exports: Vec<(String, String)>,
}

impl ProductSettings {
    /// Resolve the settings file for a product checkout.
    ///
    /// The nested form `<repo>/<product>/setup.cfg` is preferred when it
    /// exists on disk; otherwise `<repo>/setup.cfg` is used. Returns
    /// `None` when neither exists.
    pub fn locate(repo: &Path, product: &str) -> Option<PathBuf> {
        let nested = repo.join(product).join(SETTINGS_FILE);
        if nested.exists() {
            return Some(nested);
        }

        let flat = repo.join(SETTINGS_FILE);
        if flat.exists() {
            return Some(flat);
        }

        None
    }

    /// Load the settings for a product checkout, or `None` when the
    /// product has no settings file.
    pub fn load(repo: &Path, product: &str) -> Result<Option<Self>> {
        let Some(path) = Self::locate(repo, product) else {
            return Ok(None);
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        Ok(Some(Self::parse(&contents)))
    }

    /// Parse INI-style settings content.
    ///
    /// Entries are `name = value` (or `name: value`); indented lines
    /// continue the previous value, so scripts may span multiple lines.
    /// Full-line `#`/`;` comments and blank lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut settings = Self::default();
        let mut section = String::new();

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let indented = line.starts_with(' ') || line.starts_with('\t');
            let trimmed = line.trim();

            if !indented && (trimmed.starts_with('#') || trimmed.starts_with(';')) {
                continue;
            }

            if !indented && trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].to_string();
                continue;
            }

            let Some(entries) = settings.section_mut(&section) else {
                continue;
            };

            if indented {
                // Continuation of the previous value
                if let Some((_, value)) = entries.last_mut() {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                }
                continue;
            }

            if let Some((name, value)) = trimmed.split_once(['=', ':']) {
                entries.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        settings
    }

    fn section_mut(&mut self, section: &str) -> Option<&mut Vec<(String, String)>> {
        match section {
            "scripts" => Some(&mut self.scripts),
            "exports" => Some(&mut self.exports),
            _ => None,
        }
    }

    /// Whether the product declares neither scripts nor exports.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.exports.is_empty()
    }
}

/// Split a script snippet into its non-blank lines, ready to be joined
/// into a single shell invocation.
pub fn script_lines(snippet: &str) -> Vec<String> {
    snippet
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_exports() {
        let settings = ProductSettings::parse("[exports]\nAPI_KEY = x\nDEBUG = 1\n");

        assert_eq!(
            settings.exports,
            vec![
                ("API_KEY".to_string(), "x".to_string()),
                ("DEBUG".to_string(), "1".to_string()),
            ]
        );
        assert!(settings.scripts.is_empty());
    }

    #[test]
    fn test_parse_multiline_script() {
        let contents = "\
[scripts]
bootstrap =
    mkdir -p build
    make deps
";
        let settings = ProductSettings::parse(contents);

        assert_eq!(settings.scripts.len(), 1);
        let (name, snippet) = &settings.scripts[0];
        assert_eq!(name, "bootstrap");
        assert_eq!(snippet, "mkdir -p build\nmake deps");
    }

    #[test]
    fn test_parse_preserves_key_case() {
        let settings = ProductSettings::parse("[exports]\nMixedCase = kept\n");
        assert_eq!(settings.exports[0].0, "MixedCase");
    }

    #[test]
    fn test_parse_ignores_other_sections_and_comments() {
        let contents = "\
# top comment
[metadata]
name = svc-a

[exports]
; another comment
PORT: 8080
";
        let settings = ProductSettings::parse(contents);
        assert_eq!(settings.exports, vec![("PORT".to_string(), "8080".to_string())]);
    }

    #[test]
    fn test_parse_no_sections_is_empty() {
        assert!(ProductSettings::parse("[metadata]\nname = x\n").is_empty());
        assert!(ProductSettings::parse("").is_empty());
    }

    #[test]
    fn test_locate_prefers_nested() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("svc-a")).unwrap();
        fs::write(temp.path().join("svc-a/setup.cfg"), "[exports]\nA = nested\n").unwrap();
        fs::write(temp.path().join("setup.cfg"), "[exports]\nA = flat\n").unwrap();

        let path = ProductSettings::locate(temp.path(), "svc-a").unwrap();
        assert_eq!(path, temp.path().join("svc-a/setup.cfg"));

        let settings = ProductSettings::load(temp.path(), "svc-a").unwrap().unwrap();
        assert_eq!(settings.exports[0].1, "nested");
    }

    #[test]
    fn test_locate_falls_back_to_flat() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("setup.cfg"), "[exports]\nA = flat\n").unwrap();

        let path = ProductSettings::locate(temp.path(), "svc-a").unwrap();
        assert_eq!(path, temp.path().join("setup.cfg"));
    }

    #[test]
    fn test_locate_absent() {
        let temp = TempDir::new().unwrap();
        assert!(ProductSettings::locate(temp.path(), "svc-a").is_none());
        assert!(ProductSettings::load(temp.path(), "svc-a").unwrap().is_none());
    }

    #[test]
    fn test_script_lines_filters_blanks() {
        let lines = script_lines("echo one\n\n  \necho two\n");
        assert_eq!(lines, vec!["echo one", "echo two"]);
    }
}
