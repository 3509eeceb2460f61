pub mod code_generator;
pub mod jwt;
pub mod promotion_code;
pub mod promotion_metrics;
pub mod promotion_rules;

pub use code_generator::*;
pub use jwt::*;
pub use promotion_code::*;
pub use promotion_metrics::*;
pub use promotion_rules::*;
