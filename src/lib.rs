// Public API
pub mod cli;
pub mod commands;

// Core domain types
mod activate;
mod registry;
mod scm;
mod settings;
mod setup;
mod ui;
mod util;
mod workspace;

// Re-export main types
pub use activate::write_activation;
pub use registry::{register_group, EditableProductsStore, UserConfigStore};
pub use scm::GitCheckout;
pub use settings::ProductSettings;
pub use setup::{
    setup_group, BashRunner, Checkout, CommandEnvBuilder, EnvironmentBuilder, ScriptRunner,
    SetupError, SetupReport,
};
pub use workspace::{Workspace, WorkspaceConfig};
