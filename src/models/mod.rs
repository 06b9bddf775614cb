pub mod delivery;
pub mod driver;
pub mod geo;
pub mod offer;
pub mod vehicle;
