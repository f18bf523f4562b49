//! Printshop storefront library.
//!
//! The storefront server (`main.rs`) and the `ps-cli` tool share everything
//! here: configuration, repositories, integration clients and the router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
