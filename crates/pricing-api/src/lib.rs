//! HTTP serving surface for the house price pipeline

pub mod api;
pub mod config;
pub mod startup;
