// Re-export all model types for ease of use

pub mod user;
pub mod content;
pub mod file_type;

pub use user::*;
pub use content::*;
pub use file_type::*;

/// Random, collision-free name for generated test data: `<prefix>-<uuid>`
pub fn random_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
