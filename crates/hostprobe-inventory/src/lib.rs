//! hostprobe-inventory: target resolution
//!
//! Turns an Ansible/Molecule inventory into the ordered list of `Target`s a
//! verification session runs against.

pub mod ansible;
pub mod error;
pub mod resolver;
pub mod source;
pub mod types;

pub use error::InventoryError;
pub use resolver::{ResolverConfig, TargetResolver, resolve};
pub use source::InventorySource;
pub use types::{SshParams, Target, Transport, TransportKind};
