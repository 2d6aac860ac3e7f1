//! # warmgate
//!
//! `warmgate` is a deployment bootstrap for long-running gateway services
//! running on container platforms that health-probe the service port from the
//! moment the process starts. It resolves a stable gateway token, materializes
//! the gateway's configuration document exactly once per volume, answers
//! health probes from a temporary shim while the gateway warms up, and then
//! supervises the gateway as a direct child with transparent signal
//! forwarding and exit-code propagation.
//!
//! The boot sequence is `token` -> `config` -> `shim` (spawned) -> `process`.
pub mod cmd;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod process;
pub mod shim;
pub mod token;
pub mod write;
