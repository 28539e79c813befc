// ============================================================================
// Clients - calls to services this one depends on
// ============================================================================

pub mod user_directory;

pub use user_directory::{
    DirectoryError, HttpUserDirectory, UserDirectory, UserDirectoryClient, ACTOR_ID_HEADER,
    ACTOR_ROLES_HEADER,
};
