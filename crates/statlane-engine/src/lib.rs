pub mod align;
pub mod axis;
pub mod columns;
pub mod filter_compiler;
pub mod funnel;
pub mod referrers;
pub mod time_buckets;

pub use statlane_core::params::ParamMap;
pub use statlane_core::store::EventStore;
