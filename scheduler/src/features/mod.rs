//! Survey features: state accumulated from executed observations.

pub mod counter;
pub mod pair_in_night;

pub use counter::ObservationCounter;
pub use pair_in_night::PairInNight;
