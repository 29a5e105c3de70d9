pub mod hairstyle;
pub mod image;
pub mod job;
pub mod preferences;

pub use hairstyle::*;
pub use image::*;
pub use job::*;
pub use preferences::*;
