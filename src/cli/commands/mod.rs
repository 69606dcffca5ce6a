//! One module per subcommand. Each exposes `execute`, called from `main`.

pub mod completions;
pub mod delete;
pub mod export;
pub mod get;
pub mod import_cmd;
pub mod init;
pub mod list;
pub mod lock;
pub mod passwd;
pub mod set;
pub mod workflow_delete;
pub mod workflow_list;
pub mod workflow_new;
pub mod workflow_run;
pub mod workflow_show;
