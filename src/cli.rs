use clap::{Parser, Subcommand};

/// Workspace tools - manage groups of product repositories
///
/// wst checks out named product groups, develops each product's
/// environment, runs their declared setup scripts, and generates an
/// activation file (`activate_<group>`) that switches your shell into
/// the group's environment.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up a product group as an editable development environment
    ///
    /// Checks the group out, records it as editable, develops each
    /// product's environment, runs setup scripts, and writes
    /// ./activate_<group> when any product declares exports. Run from
    /// the workspace directory, not inside a product repo.
    Setup {
        /// Product group name defined in workspace.toml
        #[arg(value_name = "GROUP")]
        product_group: String,
    },

    /// Check out or update products and product groups
    Checkout {
        /// Product URLs, names, or group names
        #[arg(value_name = "TARGET", required = true, num_args = 1..)]
        targets: Vec<String>,
    },
}
