//! Safe SQL builder: identifiers from table metadata only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
