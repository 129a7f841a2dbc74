use crate::cli::{Cli, Commands};
use crate::Workspace;
use anyhow::Result;

mod checkout;
mod setup;

pub fn execute(cli: Cli) -> Result<()> {
    // The workspace is rooted at the current directory
    let workspace = Workspace::discover()?;

    match cli.command {
        Commands::Setup { product_group } => setup::execute(&workspace, &product_group),

        Commands::Checkout { targets } => checkout::execute(&workspace, &targets),
    }
}
