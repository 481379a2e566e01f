//! Executors and their dispatch.
//!
//! This module provides:
//! - The [`Executor`] capability and a closure adapter
//! - An explicit [`ExecutorRegistry`] replacing subclass-based dispatch
//! - The [`ExecutionOrchestrator`] failure boundary
//! - A container-backed tool executor

mod container;
mod executor;
mod orchestrator;
mod registry;

pub use container::{
    ContainerClient, ContainerHandle, ContainerRunConfig, ToolContainerExecutor,
    CONTAINER_NAME_KEY, TOOL_CONTAINER_EXECUTOR,
};
pub use executor::{Executor, FnExecutor};
pub use orchestrator::ExecutionOrchestrator;
pub use registry::{ExecutorFactory, ExecutorRegistry};
