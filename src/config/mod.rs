pub mod hooks;
pub mod types;

pub use hooks::*;
pub use types::*;
