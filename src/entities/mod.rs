pub mod brands;
pub mod promotions;

pub use brands as brand_entity;
pub use promotions as promotion_entity;
