mod capture;
mod record;
mod staging;
mod submit;
pub use capture::*;
pub use record::*;
pub use staging::*;
pub use submit::*;
