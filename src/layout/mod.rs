mod bound;
mod copies;
pub use bound::*;
pub use copies::*;
