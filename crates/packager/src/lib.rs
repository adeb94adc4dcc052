#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Driver package transformation for wdm
//!
//! Takes a vendor driver installer archive, strips the OS version gate from
//! its `Distribution` manifest, rebuilds the component and product packages
//! with the platform's archive tools, publishes the result and hands it to
//! the system installer.

pub mod manifest;
pub mod resources;
pub mod staging;
mod transformer;

pub use manifest::{
    is_excluded_component, patch_document, patch_manifest, PatchedManifest, ProductIdentity,
};
pub use resources::{substitute_resources, SubstitutionReport};
pub use staging::{product_file_name, StagingArea};
pub use transformer::{
    PackageTransformer, TransformReport, TransformRequest, TransformerSettings,
};
