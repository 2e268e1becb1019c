mod check;
mod generate;
mod list;
mod util;
mod watch;

pub(crate) use check::cmd_check;
pub(crate) use generate::cmd_generate;
pub(crate) use list::cmd_list;
pub(crate) use util::{load_options, project_root};
pub(crate) use watch::cmd_watch;
