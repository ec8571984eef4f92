//! Scopeforge: break a project down into modules, user stories and
//! features, keep the hierarchy consistent, query it, and recommend scope.

pub mod config;
pub mod db;
pub mod integrity;
pub mod models;
pub mod query;
pub mod recommend;
pub mod render;
pub mod stats;
