//! Individual stages of a deployment.
//!
//! Each stage is a plain function over paths; the deployer runs them in
//! order and stops at the first error.

pub mod activate;
pub mod archive;
pub mod extract;
pub mod identify;
pub mod permissions;
pub mod prune;
