use anyhow::Result;

use crate::scm::{self, GitCheckout};
use crate::ui;
use crate::Workspace;

pub fn execute(workspace: &Workspace, targets: &[String]) -> Result<()> {
    let checkout = GitCheckout::new(workspace);

    for target in workspace.expand_product_groups(targets)? {
        let target = target.trim_end_matches('/');
        let path = checkout.checkout_path(target);

        if path.exists() {
            ui::status("Updating", scm::product_name(target));
        } else {
            ui::status("Checking out", target);
        }

        scm::checkout_product(target, &path)?;
    }

    Ok(())
}
