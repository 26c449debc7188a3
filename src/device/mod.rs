mod fns;
mod memory;
pub use fns::*;
pub use memory::*;
