//! Sandboxed execution of a single program against a single stdin.
//!
//! [`SandboxRunner`] is the contract the grading pipeline depends on.
//! [`ContainerSandbox`] implements it on top of a [`ContainerBackend`]
//! (normally [`DockerBackend`]): one fresh container per run, no network,
//! bounded memory/cpu/pids, the source mounted read-only, a wall-clock
//! timeout, and the container removed on every exit path.

pub mod backend;
pub mod docker;
pub mod error;
pub mod sandbox;

pub use backend::{ContainerBackend, ContainerOutput, ContainerSpec};
pub use docker::DockerBackend;
pub use error::RunnerError;
pub use sandbox::{ContainerSandbox, RunOutcome, SandboxRunner};
