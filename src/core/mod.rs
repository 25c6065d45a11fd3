//! core
//!
//! Core domain types and configuration for scmkit.
//!
//! # Modules
//!
//! - [`types`] - Status records and change kinds
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states (a status record cannot claim
//!   to be staged unless its change kind is a staged kind)
//! - Schemas are strict and self-describing

pub mod config;
pub mod types;
