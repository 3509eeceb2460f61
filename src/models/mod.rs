pub mod brand;
pub mod common;
pub mod pagination;
pub mod promotion;

pub use brand::*;
pub use common::*;
pub use pagination::*;
pub use promotion::*;
