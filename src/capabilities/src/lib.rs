pub mod discovery;
pub mod mesh;
pub mod registry;
pub mod version;

pub use discovery::{resource_exists, Discovery, ObjectReader, ResourceRef};
pub use registry::*;

#[cfg(test)]
pub mod fixtures;
