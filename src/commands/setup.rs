use anyhow::Result;

use crate::scm::GitCheckout;
use crate::setup::{setup_group, BashRunner, CommandEnvBuilder};
use crate::ui;
use crate::{UserConfigStore, Workspace};

pub fn execute(workspace: &Workspace, group: &str) -> Result<()> {
    let mut store = UserConfigStore::new(Workspace::user_config_path()?);
    let checkout = GitCheckout::new(workspace);
    let builder = CommandEnvBuilder::new(workspace.config().develop.command.clone());

    let report = setup_group(workspace, group, &mut store, &checkout, &builder, &BashRunner)?;

    let failures = report.failures();
    for (product, err) in &failures {
        ui::warn(format!("{}: {:#}", product, err));
    }

    match &report.activation {
        Some(path) => {
            ui::success("Setup", format!("{} products ready", group));
            ui::info(format!(
                "Created {}. To activate, run: source activate_{}. To deactivate, run: deactivate_{}",
                path.display(),
                group,
                group
            ));
        }
        None => {
            ui::success("Setup", format!("{} products ready (no exports declared)", group));
        }
    }

    Ok(())
}
