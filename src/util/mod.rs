pub mod duration;
pub mod locator;

pub use duration::readable_duration;
