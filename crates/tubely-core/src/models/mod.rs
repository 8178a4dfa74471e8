pub mod orientation;
pub mod video;

pub use orientation::OrientationBucket;
pub use video::{Video, VideoResponse};
