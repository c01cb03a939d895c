//! Repository access over git.

mod accessor;

pub use accessor::{Checkout, DEFAULT_REMOTE_BASE, GitCli, RepositoryAccessor};
