use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Render and write the activation file for a product group.
///
/// The file is named `activate_<group>` and written into `dir` with a
/// truncating overwrite, so re-running setup never accumulates stale
/// exports. It contains the sorted `export` lines, a guard that
/// decorates `$PS1` with `{<group>}` at most once, and a matching
/// `deactivate_<group>` function that undoes both and removes itself.
///
/// Export names and values are written as-is; an invalid name fails
/// only when the file is sourced.
pub fn write_activation(
    dir: &Path,
    group: &str,
    exports: &BTreeMap<String, String>,
) -> Result<PathBuf> {
    let path = dir.join(format!("activate_{}", group));
    let contents = render(group, exports);

    fs::write(&path, contents)
        .with_context(|| format!("Failed to write activation file {:?}", path))?;

    Ok(path)
}

fn render(group: &str, exports: &BTreeMap<String, String>) -> String {
    let mut out = String::new();

    for (name, value) in exports {
        let _ = writeln!(out, "export {}={}", name, value);
    }
    out.push('\n');

    let _ = writeln!(out, "if [[ $PS1 != *{{{group}}}* ]]; then");
    let _ = writeln!(out, "  export PS1=\"{{{group}}}$PS1\"");
    let _ = writeln!(out, "fi");
    out.push('\n');

    let _ = writeln!(out, "deactivate_{}() {{", group);
    for name in exports.keys() {
        let _ = writeln!(out, "  unset {}", name);
    }
    out.push('\n');
    let _ = writeln!(out, "  export PS1=${{PS1/{{{group}\\}}/}}");
    let _ = writeln!(out, "  unset deactivate_{}", group);
    let _ = writeln!(out, "}}");

    out
}
