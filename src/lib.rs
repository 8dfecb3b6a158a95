//! FxGate - Exchange-Rate Gateway
//!
//! This crate serves currency exchange rates and converted product prices over
//! HTTP. Rate lookups go through a cache-aside decorator that stores one entry
//! per unordered currency pair, and every authenticated tenant is metered by a
//! fixed-window rate limiter.

pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ratelimit;
pub mod rates;
