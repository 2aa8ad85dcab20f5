pub mod error;
pub mod models;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use models::{EntityName, Group, GroupWithMembers, Membership, User, MAX_NAME_LEN};
