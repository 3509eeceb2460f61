pub mod brand_service;
pub mod promotion_analytics_service;
pub mod promotion_bulk_service;
pub mod promotion_service;

pub use brand_service::*;
pub use promotion_analytics_service::*;
pub use promotion_bulk_service::*;
pub use promotion_service::*;
