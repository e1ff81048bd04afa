//! Collaborator traits consumed by the lifecycle manager.

mod factory;
mod handle;

pub use factory::HandleFactory;
pub use handle::{PrimaryHandle, StatelessHandle};
