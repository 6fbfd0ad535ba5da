//! CLI subcommand implementations.

pub mod contraction;
pub mod kicks;
pub mod session;
pub mod status;
pub mod util;
pub mod watch;
pub mod week;
