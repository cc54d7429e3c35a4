//! CLI command implementations

pub mod activate;
pub mod buckets;
pub mod check;
pub mod completions;
pub mod config;
pub mod fetch;
pub mod install;
pub mod message;
pub mod reset;
pub mod status;

pub use activate::execute as activate;
pub use buckets::execute as buckets;
pub use check::execute as check;
pub use completions::execute as completions;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use message::execute as message;
pub use reset::execute as reset;
pub use status::execute as status;
