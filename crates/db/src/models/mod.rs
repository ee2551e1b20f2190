//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, a `Deserialize` create DTO where inserts exist, and
//! conversions into the guidepost-core domain types.

pub mod checkpoint;
pub mod playback_session;
pub mod progress_event;
pub mod remedial_clip;
pub mod video;
