pub mod address;
pub mod brand;
pub mod name;
pub mod normalize;
pub mod query;

pub use address::validate_city;
pub use brand::{brand_family, brands_compatible, extract_brand_prefix};
pub use name::{analyze_match, analyze_match_in_city};
pub use normalize::normalize;
pub use query::generate_queries;
