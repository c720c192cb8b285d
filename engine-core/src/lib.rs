pub mod abi;
pub mod error;
pub mod math;
pub mod model;
pub mod ports;
pub mod reconcile;
pub mod swap;

pub use error::*;
pub use math::*;
pub use model::*;
pub use ports::*;
pub use reconcile::*;
pub use swap::*;
