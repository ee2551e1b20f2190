pub mod clips;
pub mod playback;
pub mod videos;
