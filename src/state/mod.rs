mod barrier;
mod image;
mod state;
pub use barrier::*;
pub use image::*;
pub use state::*;
