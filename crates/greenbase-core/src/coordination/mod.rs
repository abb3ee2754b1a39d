//! Branch and commit resolution

pub mod branch;
pub mod resolver;

pub use branch::resolve_branch;
pub use resolver::CommitResolver;
