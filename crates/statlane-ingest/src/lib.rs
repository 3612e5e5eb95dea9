pub mod enrich;
pub mod identity;
pub mod salt;
pub mod screen;
pub mod track;

pub use identity::{session_key, IdentityDeriver};
pub use screen::Outcome;
pub use track::Ingestor;
