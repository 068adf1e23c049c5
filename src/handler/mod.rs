//! Request handler module
//!
//! Responsible for request routing dispatch and the file-serving pipeline.
//! The HTTP boundary lives in `router`; the validation and path-resolution
//! core lives in `textfile` and carries no HTTP types.

pub mod router;
pub mod textfile;

// Re-export main entry point
pub use router::handle_request;
