//! Cinema is a parametric document store for precomputed visualization results.
//!
//! A store holds one document (usually an image) per point of a discrete parameter space,
//! together with a JSON schema file describing that space. Documents are addressed by
//! descriptors (parameter name to value maps) and retrieved with partial-descriptor queries.
//!
//! # Pieces
//!
//! - **Schema**: [`Parameter`] domains, the [`ParameterSchema`], and the [`DependencyGraph`]
//!   that limits which parameters are enumerated under which controller values.
//! - **Stores**: the [`Store`] contract and two backends, [`FileStore`] (one file per document,
//!   located by a [`NamePattern`]) and [`SingleFileStore`] (one packed RGB [`Volume`]).
//! - **Exploration**: the [`Explorer`] walks the parameter space respecting dependencies and
//!   drives [`Track`]s that produce or annotate each [`Document`].
//!
//! # Example
//!
//! ```no_run
//! use cinema::{DescriptorTrack, Explorer, FileStore, Store, descriptor, make_parameter};
//!
//! # fn main() -> cinema::CinemaResult<()> {
//! let mut store = FileStore::new("out/info.json");
//! store.add_parameter("theta", make_parameter("theta", [0, 10, 20])?)?;
//! store.add_parameter("phi", make_parameter("phi", [0, 10])?)?;
//! store.set_filename_pattern("{theta}/{phi}.txt")?;
//! store.create()?;
//!
//! Explorer::for_all(&mut store, vec![Box::new(DescriptorTrack)]).explore(None)?;
//!
//! for doc in store.find(&descriptor([("theta", 10)]))? {
//!     println!("{}", doc?.text().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod explore;
mod foundation;
mod schema;
mod store;

pub use explore::camera::{CameraPose, OrbitCamera, orbit_angles};
pub use explore::explorer::{ExploreOpts, ExploreStats, Explorer, TraversalPlan};
pub use explore::track::{DescriptorTrack, FnTrack, MetadataTrack, PrepareContext, Track};
pub use foundation::error::{CinemaError, CinemaResult};
pub use foundation::value::{Descriptor, Value, descriptor, format_descriptor};
pub use schema::dependency::DependencyGraph;
pub use schema::parameter::{
    Parameter, ParameterBuilder, ParameterKind, ParameterSchema, make_parameter,
};
pub use schema::product::Combinations;
pub use store::document::{Attributes, Document, Payload};
pub use store::file_store::{FileStore, FileStoreOpts, SIDECAR_SUFFIX};
pub use store::pattern::NamePattern;
pub use store::single_file::{SingleFileStore, VOLUME_FILE_NAME};
pub use store::volume::{Volume, VolumeReader};
pub use store::{DocumentIter, STORE_TYPE_KEY, Store, StoreCore, StoreInfo, open_store};
