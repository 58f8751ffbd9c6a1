//! Model-facing types: keypoints, collaborator contracts, config and checkpoint loading.

pub(crate) mod checkpoint;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod keypoints;
pub(crate) mod network;
/// Pure-Rust stand-ins for the pretrained networks.
pub mod reference;
