//! Tricorder is the value model for a single metric sample. A metric's value
//! lives in one of two representations: a natively typed one carried by the
//! binary RPC transport and a textual one carried by the JSON HTTP API. This
//! crate defines both, converts strictly between them and ships the codec for
//! the native form.
//!
//! The main pieces:
//!
//!  * `types::Kind`, the closed enumeration of value kinds.
//!  * `messages`, holding `Metric`, `Value`, `Distribution` and the
//!    conversion engine.
//!  * `codec`, the native binary framing with an explicit codec registry.
//!  * `health`, the health and readiness flags plus their HTTP endpoints.
//!
//! The `tricorder` binary serves the health endpoints.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate byteorder;
extern crate chrono;
extern crate clap;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate tiny_http;
extern crate toml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;

pub mod codec;
pub mod config;
pub mod duration;
pub mod error;
pub mod health;
pub mod http;
pub mod messages;
pub mod types;
pub mod units;

pub use error::Error;
