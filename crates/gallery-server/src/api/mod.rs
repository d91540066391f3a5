//! HTTP API handlers.
//!
//! Defines the Actix routes for listing, ordering, collections and streaming.

pub mod categories;
pub mod collections;
pub mod health;
pub mod media;
pub mod stats;
pub mod streams;
pub mod videos;

pub use categories::list_categories;
pub use collections::{collection_image, list_collections};
pub use media::stream_video;
pub use streams::events_stream;
pub use videos::{list_videos, random_video, search_suggestions};
