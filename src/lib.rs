//! Cocotte - A recipe and blog platform REST API
//!
//! This library provides the core functionality for the Cocotte platform.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod seed;
pub mod services;
