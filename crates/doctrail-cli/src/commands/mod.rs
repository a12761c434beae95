//! Command handlers

pub mod auth;
pub mod config;
pub mod documents;
pub mod remote;
pub mod status;
