use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::activate;
use crate::registry::{self, EditableProductsStore};
use crate::scm;
use crate::settings::{script_lines, ProductSettings};
use crate::util::ScopedDir;
use crate::workspace::Workspace;

/// Fatal preconditions for group setup. Anything past these is handled
/// per product and never aborts the run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("setup should be run from the workspace directory, not within a product repo")]
    InsideRepo,
    #[error("product group \"{0}\" is not defined in workspace.toml")]
    UnknownGroup(String),
}

/// Checkout collaborator: clone or update a list of products or product
/// groups. Its per-product retry policy is opaque here; a failure aborts
/// the whole group setup.
pub trait Checkout {
    fn checkout(&self, targets: &[String]) -> Result<()>;
}

/// Environment-build collaborator, invoked with the current directory
/// set to the product root.
pub trait EnvironmentBuilder {
    fn build(&self, redevelop: bool, install_only: bool) -> Result<()>;
}

/// Script-execution capability: run a setup snippet's lines as one
/// shell invocation in `working_dir`.
pub trait ScriptRunner {
    fn run(&self, working_dir: &Path, lines: &[String]) -> Result<()>;
}

/// Runs the configured develop command (default `tox`), mapping
/// redevelop to `-r` and install-only to `--notest`.
pub struct CommandEnvBuilder {
    command: String,
}

impl CommandEnvBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl EnvironmentBuilder for CommandEnvBuilder {
    fn build(&self, redevelop: bool, install_only: bool) -> Result<()> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .context("Develop command is empty")?;

        let mut command = Command::new(program);
        command.args(parts);
        if redevelop {
            command.arg("-r");
        }
        if install_only {
            command.arg("--notest");
        }

        let status = command
            .status()
            .with_context(|| format!("Failed to run develop command '{}'", self.command))?;

        if !status.success() {
            anyhow::bail!("Develop command '{}' exited with {}", self.command, status);
        }

        Ok(())
    }
}

/// Joins the snippet lines with `; ` and hands them to `bash -c`.
pub struct BashRunner;

impl ScriptRunner for BashRunner {
    fn run(&self, working_dir: &Path, lines: &[String]) -> Result<()> {
        let status = Command::new("bash")
            .arg("-c")
            .arg(lines.join("; "))
            .current_dir(working_dir)
            .status()
            .context("Failed to run bash")?;

        if !status.success() {
            anyhow::bail!("Script exited with {}", status);
        }

        Ok(())
    }
}

/// Outcome of one group setup run.
///
/// Per-product failures are collected rather than raised, so the caller
/// can enumerate them; the run itself reports completion regardless of
/// how many products failed.
#[derive(Debug)]
pub struct SetupReport {
    pub group: String,
    /// Environment-build outcome per product, in expansion order.
    pub develop: Vec<(String, Result<()>)>,
    /// Settings-processing outcome per product, in expansion order.
    pub settings: Vec<(String, Result<()>)>,
    /// Exports merged across all products; later products win.
    pub exports: BTreeMap<String, String>,
    /// Path of the generated activation file, if any export was declared.
    pub activation: Option<PathBuf>,
}

impl SetupReport {
    /// Products that failed either the develop or the settings step.
    pub fn failures(&self) -> Vec<(&str, &anyhow::Error)> {
        self.develop
            .iter()
            .chain(self.settings.iter())
            .filter_map(|(product, result)| {
                result.as_ref().err().map(|err| (product.as_str(), err))
            })
            .collect()
    }
}

/// Set up a product group: check it out, register it as editable,
/// develop each product's environment, then run setup scripts and merge
/// exports into an activation file.
///
/// Preconditions are fatal: the workspace root must not be inside a
/// repo, and `group` must be configured. Past checkout and registry
/// update, every step is isolated per product.
pub fn setup_group(
    workspace: &Workspace,
    group: &str,
    store: &mut dyn EditableProductsStore,
    checkout: &dyn Checkout,
    builder: &dyn EnvironmentBuilder,
    runner: &dyn ScriptRunner,
) -> Result<SetupReport> {
    if scm::is_repo(workspace.root()) {
        return Err(SetupError::InsideRepo.into());
    }
    if !workspace.has_group(group) {
        return Err(SetupError::UnknownGroup(group.to_string()).into());
    }

    tracing::info!("Setting up {} products", group);

    checkout
        .checkout(&[group.to_string()])
        .with_context(|| format!("Failed to check out product group \"{}\"", group))?;

    if registry::register_group(store, group)? {
        tracing::info!("Added \"{}\" to editable_products", group);
    }

    let products = workspace.expand_product_groups(&[group.to_string()])?;

    let mut report = SetupReport {
        group: group.to_string(),
        develop: Vec::new(),
        settings: Vec::new(),
        exports: BTreeMap::new(),
        activation: None,
    };

    // Develop each product's environment; one failure never stops the rest.
    for target in &products {
        let product = scm::product_name(target);
        let path = workspace.product_path(&product);

        tracing::info!("Developing environment for {}", product);
        let result = develop_product(&path, builder);
        if let Err(err) = &result {
            tracing::error!("Error occurred when developing {}: {:#}", product, err);
        }
        report.develop.push((product, result));
    }

    // Run setup scripts and merge exports, again isolated per product.
    for target in &products {
        let product = scm::product_name(target);
        let path = workspace.product_path(&product);

        let result = process_settings(&path, &product, runner, &mut report.exports);
        if let Err(err) = &result {
            tracing::error!("Error occurred processing settings for {}: {:#}", product, err);
        }
        report.settings.push((product, result));
    }

    if !report.exports.is_empty() {
        let path = activate::write_activation(workspace.root(), group, &report.exports)?;
        tracing::info!(
            "Created {:?}. To activate, run: source activate_{}. To deactivate, run: deactivate_{}",
            path,
            group,
            group
        );
        report.activation = Some(path);
    }

    Ok(report)
}

fn develop_product(path: &Path, builder: &dyn EnvironmentBuilder) -> Result<()> {
    // Scoped: the working directory is restored even when the build fails.
    let _dir = ScopedDir::enter(path)?;
    builder.build(true, true)
}

fn process_settings(
    path: &Path,
    product: &str,
    runner: &dyn ScriptRunner,
    exports: &mut BTreeMap<String, String>,
) -> Result<()> {
    let Some(settings) = ProductSettings::load(path, product)? else {
        return Ok(());
    };
    if settings.is_empty() {
        return Ok(());
    }

    tracing::info!("Processing scripts/exports in setup.cfg for {}", product);

    let mut script_error = Ok(());
    for (name, snippet) in &settings.scripts {
        tracing::info!("Running {}", name);
        if let Err(err) = runner.run(path, &script_lines(snippet)) {
            // Remaining scripts for this product are skipped, but its
            // exports still merge below.
            script_error = Err(err.context(format!("Script \"{}\" failed", name)));
            break;
        }
    }

    for (name, value) in &settings.exports {
        exports.insert(name.clone(), value.clone());
    }

    script_error
}
