//! CLI command implementations

mod flash;

pub use flash::run_flash;
