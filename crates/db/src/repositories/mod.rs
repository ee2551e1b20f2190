//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods that
//! accept `&PgPool` as the first argument. Methods that must run inside the
//! caller's transaction take `&mut PgConnection` instead.

pub mod checkpoint_repo;
pub mod clip_repo;
pub mod progress_event_repo;
pub mod session_repo;
pub mod video_repo;

pub use checkpoint_repo::CheckpointRepo;
pub use clip_repo::ClipRepo;
pub use progress_event_repo::ProgressEventRepo;
pub use session_repo::SessionRepo;
pub use video_repo::VideoRepo;
