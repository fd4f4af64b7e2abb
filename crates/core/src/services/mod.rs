//! Collaborator seams: signature extraction and its concrete backends.

pub mod backends;
pub mod extract;
