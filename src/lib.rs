//! Murmur: a small social blogging server with groups, comments and
//! follower feeds.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
