pub mod booking;
pub mod locator;
pub mod offers;
pub mod pairing;
pub mod pricing;
pub mod quote;
pub mod route;
pub mod scheduler;
pub mod scheduling;
