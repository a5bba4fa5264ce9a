mod build;
mod config;
mod models;

pub use build::BuildArgs;
pub use config::ConfigCommand;

pub use build::handle_build;
pub use config::handle_config;
pub use models::handle_models;
