mod capture;
mod device;
mod error;
mod format;
mod layout;
mod settings;
mod state;

pub use capture::*;
pub use device::*;
pub use error::*;
pub use format::*;
pub use layout::*;
pub use settings::*;
pub use state::*;
