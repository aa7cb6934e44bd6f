pub mod filter;
pub mod observation;

pub use filter::*;
pub use observation::*;
