//! imagebake-lib: drives a Packer-compatible build tool for a declarative
//! infrastructure engine.
//!
//! The crate is organized around three layers:
//! - `rendezvous`: coordination of independently scheduled tasks on named
//!   build lifecycles (one driver, many observers)
//! - `packer`: interop with the external tool (environment, invocation,
//!   variables, version, manifest)
//! - `provider`: the plugin surface the engine consumes (image resource and
//!   data sources)

pub mod packer;
pub mod provider;
pub mod rendezvous;
pub mod util;
