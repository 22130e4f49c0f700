use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::explore::track::{PrepareContext, Track};
use crate::foundation::error::{CinemaError, CinemaResult};
use crate::foundation::value::{Descriptor, Value, format_descriptor};
use crate::schema::dependency::DependencyGraph;
use crate::schema::product::Combinations;
use crate::store::Store;
use crate::store::document::Document;

/// Options controlling an exploration run.
#[derive(Clone, Debug, Default)]
pub struct ExploreOpts {
    /// Checked after every inserted document; when set the run stops early, still finishing
    /// tracks and flushing the store.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Exploration run statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExploreStats {
    /// Documents handed to the store.
    pub documents: u64,
    /// Whether the run stopped on the cancel flag.
    pub cancelled: bool,
}

/// Walks a store's parameter space and drives tracks and insertion for every descriptor.
///
/// Parameters that are dependents in the store's dependency graph are only enumerated for
/// the outer combinations that unlock them. Track failures abort the run; documents already
/// inserted stay in the store.
pub struct Explorer<'s> {
    store: &'s mut dyn Store,
    parameters: Vec<String>,
    tracks: Vec<Box<dyn Track + 's>>,
    opts: ExploreOpts,
}

impl<'s> Explorer<'s> {
    /// Explorer varying `parameters` (the rest stay at their defaults).
    pub fn new(
        store: &'s mut dyn Store,
        parameters: Vec<String>,
        tracks: Vec<Box<dyn Track + 's>>,
    ) -> Self {
        Self {
            store,
            parameters,
            tracks,
            opts: ExploreOpts::default(),
        }
    }

    /// Explorer varying every parameter of the store.
    pub fn for_all(store: &'s mut dyn Store, tracks: Vec<Box<dyn Track + 's>>) -> Self {
        let parameters = store.parameters().names().map(str::to_string).collect();
        Self::new(store, parameters, tracks)
    }

    /// Replace the run options.
    pub fn with_opts(mut self, opts: ExploreOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Parameters this explorer varies.
    pub fn list_parameters(&self) -> &[String] {
        &self.parameters
    }

    /// The target store.
    pub fn store(&self) -> &dyn Store {
        &*self.store
    }

    /// Mutable access to the target store.
    pub fn store_mut(&mut self) -> &mut dyn Store {
        &mut *self.store
    }

    /// Lazy traversal order of a run, without invoking tracks.
    ///
    /// Independent parameters form the outer product; for each outer combination only the
    /// dependents it unlocks are expanded. Names in `fixedargs` are never expanded and are
    /// overlaid on every descriptor, whatever the dependency rules say.
    pub fn plan_iter(&self, fixedargs: Option<&Descriptor>) -> CinemaResult<TraversalPlan> {
        let fixed = fixedargs.cloned().unwrap_or_default();
        let schema = self.store.parameters();
        let graph = self.store.associations();

        let mut independent = Vec::new();
        let mut dependent = Vec::new();
        for name in &self.parameters {
            let param = schema.require(name)?;
            if fixed.contains_key(name) {
                continue;
            }
            if graph.is_dependent(name) {
                dependent.push((name.clone(), param.values.clone()));
            } else {
                independent.push(name.as_str());
            }
        }

        Ok(TraversalPlan {
            outer: schema.combinations(&independent)?,
            inner: None,
            dependent,
            graph: graph.clone(),
            fixed,
        })
    }

    /// Every descriptor of [`Explorer::plan_iter`], collected.
    pub fn plan(&self, fixedargs: Option<&Descriptor>) -> CinemaResult<Vec<Descriptor>> {
        Ok(self.plan_iter(fixedargs)?.collect())
    }

    /// Run the full traversal: prepare, execute and insert every descriptor, finish.
    ///
    /// On a track or store failure the store is still flushed before the error is returned.
    #[tracing::instrument(skip_all, fields(parameters = ?self.parameters))]
    pub fn explore(&mut self, fixedargs: Option<&Descriptor>) -> CinemaResult<ExploreStats> {
        let plan = self.plan_iter(fixedargs)?;
        self.prepare()?;

        let mut stats = ExploreStats::default();
        if let Err(err) = self.run(plan, &mut stats) {
            if let Err(flush_err) = self.store.flush() {
                tracing::error!(error = %flush_err, "flush after aborted traversal failed");
            }
            tracing::warn!(documents = stats.documents, error = %err, "traversal aborted");
            return Err(err);
        }

        self.finish()?;
        if self.store.core().is_initialized() {
            self.store.save()?;
        }
        self.store.flush()?;
        tracing::info!(
            documents = stats.documents,
            cancelled = stats.cancelled,
            "exploration finished"
        );
        Ok(stats)
    }

    fn run(&mut self, plan: TraversalPlan, stats: &mut ExploreStats) -> CinemaResult<()> {
        for desc in plan {
            self.execute(desc)?;
            stats.documents += 1;
            if self.cancelled() {
                stats.cancelled = true;
                break;
            }
        }
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.opts
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn prepare(&mut self) -> CinemaResult<()> {
        let mut ctx = PrepareContext {
            store: &mut *self.store,
            parameters: &self.parameters,
        };
        for track in &mut self.tracks {
            track.prepare(&mut ctx)?;
        }
        Ok(())
    }

    fn execute(&mut self, desc: Descriptor) -> CinemaResult<()> {
        let mut doc = Document::new(desc);
        for track in &mut self.tracks {
            if let Err(err) = track.execute(&mut doc) {
                return Err(CinemaError::traversal(
                    format_descriptor(doc.descriptor()),
                    err,
                ));
            }
        }
        self.store.insert(&doc)
    }

    fn finish(&mut self) -> CinemaResult<()> {
        for track in &mut self.tracks {
            track.finish()?;
        }
        Ok(())
    }
}

/// Descriptors of one exploration run, produced one outer combination at a time.
#[derive(Clone, Debug)]
pub struct TraversalPlan {
    outer: Combinations,
    inner: Option<(Descriptor, Combinations)>,
    dependent: Vec<(String, Vec<Value>)>,
    graph: DependencyGraph,
    fixed: Descriptor,
}

impl Iterator for TraversalPlan {
    type Item = Descriptor;

    fn next(&mut self) -> Option<Descriptor> {
        loop {
            if let Some((assigned, inner)) = &mut self.inner {
                if let Some((_, combo)) = inner.next() {
                    let mut desc = assigned.clone();
                    desc.extend(combo);
                    return Some(desc);
                }
                self.inner = None;
            }

            let (_, mut assigned) = self.outer.next()?;
            assigned.extend(self.fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
            let unlocked = self
                .dependent
                .iter()
                .filter(|(name, _)| self.graph.is_unlocked(name, &assigned))
                .cloned()
                .collect();
            self.inner = Some((assigned, Combinations::new(unlocked)));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/explore/explorer.rs"]
mod tests;
