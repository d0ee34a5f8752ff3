pub mod cli;
pub mod client;
pub mod http;
pub mod load_config;
pub mod provisioner;

pub use cli::{run_import_cli, run_prepare_all_cli, ImportCli, PrepareAllCli};
