#![forbid(unsafe_code)]

pub mod catalog;
pub mod metrics;
pub mod model;
pub mod rules;
pub mod time;

pub use time::Clock;
