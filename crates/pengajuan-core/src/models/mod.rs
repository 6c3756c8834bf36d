//! Data models for the submission pipeline
//!
//! Each sub-module covers one stage: the inbound form and files, the per-file
//! upload tasks and outcomes, the classified downstream result, and the
//! normalized response returned to the browser.

mod external;
mod response;
mod submission;
mod upload;

pub use external::*;
pub use response::*;
pub use submission::*;
pub use upload::*;
