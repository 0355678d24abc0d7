//! Watcher implementations.
//!
//! The git watcher materializes checkouts under `<working-dir>/repos` and
//! consults a commit tracker; the URL watcher materializes an unpacked
//! artifact under `<working-dir>/artifacts`.

mod git;
mod url;

pub use git::GitWatcher;
pub use url::UrlWatcher;
