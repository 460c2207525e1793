pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetcher;
pub mod reading;
pub mod scheduler;
pub mod sun_window;
pub mod writer;
