pub mod api;
pub mod config;
pub mod handlers;
pub mod humanize;
pub mod media;
pub mod observability;
pub mod providers;
