//! Manifest, digest and layer primitives shared by the registry harness.
//!
//! The types here cover the subset of the Docker distribution and OCI image
//! formats the harness needs: schema-2 / OCI manifests, manifest lists and
//! image indexes, image configs, content digests, and synthetic layers.

pub mod digest;
pub mod error;
pub mod layer;
pub mod manifest;

pub use digest::Digest;
pub use error::{OciError, Result};
pub use manifest::{Descriptor, ImageConfig, Manifest, ManifestList, ParsedManifest, Platform};
