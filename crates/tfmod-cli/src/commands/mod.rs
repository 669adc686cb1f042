//! Command implementations for the tfmod CLI.

mod aws_provider_patch;
mod catalog;

pub use aws_provider_patch::execute as patch_aws_provider;
pub use catalog::execute as browse_catalog;
