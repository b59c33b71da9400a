// Public library interface for tickermap-rs
// The binaries and any presentation layer drive the engine through these modules

pub mod fit;
pub mod frame;
pub mod layout;
pub mod scheduler;
pub mod tiles;
