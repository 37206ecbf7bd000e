//! # flowpack-remote
//!
//! The remote scheduler as seen by flowpack: the [`Session`] capability
//! trait, its Azkaban implementation, and resolution of named remotes.

pub mod alias;
pub mod azkaban;
pub mod error;
pub mod session;

pub use alias::{Credentials, RemoteAlias, RemoteTarget};
pub use azkaban::AzkabanSession;
pub use error::RemoteError;
pub use session::{Schedule, Session};
