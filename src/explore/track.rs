use crate::foundation::error::CinemaResult;
use crate::foundation::value::format_descriptor;
use crate::store::Store;
use crate::store::document::{Attributes, Document};

/// What a track sees during [`Track::prepare`].
pub struct PrepareContext<'a> {
    /// The store the explorer inserts into.
    pub store: &'a mut dyn Store,
    /// Parameters the explorer varies, in explorer order.
    pub parameters: &'a [String],
}

/// Adapter invoked by the explorer for every descriptor it produces.
///
/// Call order per run: `prepare` on every track, then for each descriptor `execute` on every
/// track in registration order, then `finish` on every track. Any error returned from
/// `execute` aborts the traversal.
pub trait Track {
    /// One-time setup before the first document.
    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> CinemaResult<()> {
        Ok(())
    }

    /// Drive external state from `document`'s descriptor and/or fill in its payload.
    fn execute(&mut self, _document: &mut Document) -> CinemaResult<()> {
        Ok(())
    }

    /// Teardown after the last document.
    fn finish(&mut self) -> CinemaResult<()> {
        Ok(())
    }
}

/// Track that runs a closure on every document.
pub struct FnTrack<F> {
    f: F,
}

impl<F> FnTrack<F>
where
    F: FnMut(&mut Document) -> CinemaResult<()>,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Track for FnTrack<F>
where
    F: FnMut(&mut Document) -> CinemaResult<()>,
{
    fn execute(&mut self, document: &mut Document) -> CinemaResult<()> {
        (self.f)(document)
    }
}

/// Track that stores the descriptor's text form as the payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct DescriptorTrack;

impl Track for DescriptorTrack {
    fn execute(&mut self, document: &mut Document) -> CinemaResult<()> {
        document.data = Some(format_descriptor(document.descriptor()).into());
        Ok(())
    }
}

/// Track that stamps store metadata during `prepare`.
#[derive(Clone, Debug, Default)]
pub struct MetadataTrack {
    metadata: Attributes,
}

impl MetadataTrack {
    /// Stamp `metadata`.
    pub fn new(metadata: Attributes) -> Self {
        Self { metadata }
    }

    /// Stamp `type: parametric-image-stack`.
    pub fn image_stack() -> Self {
        Self::new(Attributes::from_iter([(
            "type".to_string(),
            serde_json::Value::from("parametric-image-stack"),
        )]))
    }
}

impl Track for MetadataTrack {
    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> CinemaResult<()> {
        ctx.store.add_metadata(self.metadata.clone());
        Ok(())
    }
}
