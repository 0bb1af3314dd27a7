//! Command implementations for pmsync-cli

pub mod history;
pub mod init;
pub mod sync;
pub mod validate;

pub use history::run_history;
pub use init::run_init;
pub use sync::run_sync;
pub use validate::run_validate;
