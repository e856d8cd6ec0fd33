//! fusion-cache
//!
//! Tag-indexed cache with Redis and in-memory backends, plus the
//! `fusion-cache` command-line tool built on top of it.

use shadow_rs::shadow;
shadow!(build);

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;

pub use cache::{CacheError, CacheManager, IterableCache, Lifetime, TaggableCache};

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
