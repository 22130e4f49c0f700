//! Parameter-space traversal: the [`Explorer`](crate::Explorer) enumerates descriptors and
//! hands each one to its [`Track`](crate::Track)s before inserting the result into a store.

pub(crate) mod camera;
pub(crate) mod explorer;
pub(crate) mod track;
