#![warn(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

//! Binding generator for native APIs.
//!
//! Interface descriptors are loaded into a shared [`registry`], linked against it (type
//! resolution, constant folding, array-length bindings, struct layout) and emitted as Rust
//! modules or C headers. [`driver::generate`] runs the whole batch.

pub mod cli;
pub mod descriptor;
pub mod diagnostics;
pub mod driver;
pub mod emit;
pub mod error;
pub mod link;
pub mod logging;
pub mod manifest;
pub mod registry;
pub mod types;
pub mod version;

pub use descriptor::{DescriptorSource, InterfaceDescriptor, LoadOptions, load_interface};
pub use driver::{GenerateOptions, Generation, Input, generate};
pub use emit::{EmitOptions, EmittedUnit, TargetLanguage, emit};
pub use error::{Error, Result};
pub use link::{LinkOptions, LinkedInterface, link};
pub use registry::Registry;
