//! Domain logic for frameloop: request validation, the quality and frame
//! tables, upload ingestion, and the subprocess wrappers around Python and
//! ffmpeg. Nothing in here knows about HTTP.

pub mod data_url;
pub mod error;
pub mod ffmpeg;
pub mod planner;
pub mod quality;
pub mod request;
pub mod scripting;
pub mod upload;
