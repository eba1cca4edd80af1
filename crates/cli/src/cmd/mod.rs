mod check;
mod info;
mod status;
mod validate;
mod watch;

pub use check::cmd_check;
pub use info::cmd_info;
pub use status::cmd_status;
pub use validate::cmd_validate;
pub use watch::cmd_watch;
