//! Request handlers.

pub mod assembly;
pub mod clips;
pub mod events;
pub mod health;
pub mod jobs;
pub mod projects;

pub use assembly::*;
pub use clips::*;
pub use events::*;
pub use health::*;
pub use jobs::*;
pub use projects::*;
