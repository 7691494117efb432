//! Race data providers for F1 Race Replay

pub mod cache;
pub mod demo;

pub use cache::CacheProvider;
pub use demo::DemoProvider;
