//! Front Page - a newspaper-styled reader for WordPress sites
//!
//! This crate fetches the latest posts from a WordPress REST API and lays them
//! out as the front page of a broadsheet, re-rendering as the viewport changes.

pub mod api;
pub mod app;
pub mod config;
pub mod debounce;
pub mod format;
pub mod layout;
pub mod routes;
pub mod view;
