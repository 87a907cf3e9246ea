//! Client facade used by endpoint wrappers
//!
//! [`VkClient`] binds one credential to the request orchestrator, the batch
//! compiler and an HTTP transport, and adds the multi-call drivers
//! (pagination across scripts, direct pagination, multi-entity splitting).

mod builder;
mod vk;

pub use builder::VkClientBuilder;
pub use vk::{ExecuteReport, VkClient};
