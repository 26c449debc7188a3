mod format;
mod planar;
pub use format::*;
pub use planar::*;
