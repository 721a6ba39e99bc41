//! Browser (`wasm32`) implementation of the [`host_bridge::HostEnvironment`] contract.
//!
//! This crate probes the outbound channels a host injects into the page, delivers frames over the
//! selected one, exposes the inbound entry points, and provides the launch parameters, custom
//! style element, resize events, and navigation the bridge components use.
//!
//! Browser calls live under `bridge::interop`, with a non-`wasm32` shim so the crate builds and
//! tests natively.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Environment factory and session startup helpers.
pub mod adapters;
mod bridge;
pub mod environment;
pub mod launch_params;

pub use adapters::{connect, start, web_host_environment};
pub use environment::WebHostEnvironment;
pub use launch_params::LaunchParams;
