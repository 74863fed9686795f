//! Application services layer.

pub mod accounts;
pub mod error;
pub mod feed;
pub mod follow;
pub mod groups;
pub mod images;
pub mod pagination;
pub mod posts;
pub mod repos;
