//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                      |
//! |----------|---------------------------------------|
//! | `serve`  | `Serve`, `InitDb`                     |
//! | `remote` | `List`, `Pull`, `Push`, `Publish`     |
//! | `apply`  | `Apply`                               |
//! | `config` | `Config`                              |

pub mod apply;
pub mod config;
pub mod remote;
pub mod serve;

pub use apply::cmd_apply;
pub use config::cmd_config;
pub use remote::{cmd_list, cmd_publish, cmd_pull, cmd_push};
pub use serve::{cmd_init_db, cmd_serve};
