//! textserve - serves `.txt`/`.html` files from a restricted directory.
//!
//! One business endpoint: `GET /?filename=<name>` validates the name against
//! an extension allow-list, resolves it safely under the configured base
//! directory, and returns the file content. Any resolution outside the base
//! directory is refused.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
