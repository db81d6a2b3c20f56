//! regharness: Integration Harness for an Image Registry
//!
//! Test infrastructure for a container image registry that resolves
//! repositories against image streams, mirrors blobs from upstream
//! registries, and refuses request loops.
//!
//! # Key Features
//!
//! - **Fake control plane**: [`fake::FakeOpenShift`] keeps images and image
//!   streams in memory and serves the subset of the image API the registry
//!   middleware uses
//! - **Mirroring waits**: [`storage::WaitDriver`] lets tests block until
//!   pull-through has written the paths they expect
//! - **Loop detection**: [`requesttrace::RequestTracer`] stamps and checks
//!   the `X-Registry-Request-URL` header on chained fetches
//! - **Harness utilities**: free ports, readiness probes, HTTPS termination,
//!   counters, log capture and image fixtures in [`testutil`]
//!
//! # Example: Mapping an Image Into a Stream
//!
//! ```
//! use regharness::fake::FakeOpenShift;
//! use regharness::testutil::fixtures::{new_image_stream, new_image_stream_mapping, new_random_image};
//!
//! # fn main() -> regharness::Result<()> {
//! let fos = FakeOpenShift::new();
//! fos.create_image_stream(new_image_stream("ns", "app"))?;
//!
//! let (image, layers) = new_random_image("registry.local/ns/app", 2, 512)?;
//! let name = image.name().to_string();
//! fos.create_image_stream_mapping("ns", new_image_stream_mapping("ns", "app", "latest", image))?;
//!
//! let view = fos.get_image_stream_layers("ns", "app")?;
//! assert_eq!(view.images[&name].layers.len(), layers.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod fake;
pub mod requesttrace;
pub mod storage;
pub mod testutil;

// Re-exports for convenience
pub use config::HarnessConfig;
pub use error::{Error, Result};
pub use fake::FakeOpenShift;

// Prelude for common imports
pub mod prelude {
    pub use crate::api::{Image, ImageStream, ImageStreamMapping, ImageStreamTag, ObjectMeta};
    pub use crate::config::HarnessConfig;
    pub use crate::error::{Error, Result};
    pub use crate::fake::{Action, FakeOpenShift, Object, Outcome, Resource, Verb};
    pub use crate::requesttrace::{RequestTrace, RequestTracer, REQUEST_URL_HEADER};
    pub use crate::storage::{InMemoryDriver, StorageDriver, StorageError, WaitDriver};
}
