use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::descriptor;
use crate::explore::track::{DescriptorTrack, FnTrack, MetadataTrack};
use crate::foundation::value::Value;
use crate::schema::parameter::make_parameter;
use crate::store::{DocumentIter, StoreCore};

/// Keeps inserted documents in memory and counts flushes.
struct MemStore {
    core: StoreCore,
    docs: Vec<Document>,
    flushes: usize,
    fail_insert_at: Option<usize>,
}

impl MemStore {
    fn new() -> Self {
        Self {
            core: StoreCore::new("mem/info.json"),
            docs: Vec::new(),
            flushes: 0,
            fail_insert_at: None,
        }
    }

    fn with(params: &[(&str, Vec<i64>)]) -> Self {
        let mut store = Self::new();
        for (name, values) in params {
            store
                .add_parameter(name, make_parameter(name, values.clone()).unwrap())
                .unwrap();
        }
        store
    }
}

impl Store for MemStore {
    fn core(&self) -> &StoreCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StoreCore {
        &mut self.core
    }

    fn create(&mut self) -> CinemaResult<()> {
        self.core.check_uninitialized("create")?;
        self.core.mark_initialized();
        Ok(())
    }

    fn load(&mut self) -> CinemaResult<()> {
        self.core.check_uninitialized("load")?;
        self.core.mark_initialized();
        Ok(())
    }

    fn save(&self) -> CinemaResult<()> {
        Ok(())
    }

    fn insert(&mut self, document: &Document) -> CinemaResult<()> {
        if self.fail_insert_at == Some(self.docs.len()) {
            return Err(CinemaError::payload("disk full"));
        }
        self.docs.push(document.clone());
        Ok(())
    }

    fn find<'a>(&'a self, query: &Descriptor) -> CinemaResult<DocumentIter<'a>> {
        let query = query.clone();
        Ok(Box::new(
            self.docs
                .iter()
                .filter(move |d| query.iter().all(|(k, v)| d.descriptor().get(k) == Some(v)))
                .cloned()
                .map(Ok),
        ))
    }

    fn flush(&mut self) -> CinemaResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn plan_is_full_product_without_dependencies() {
    let mut store = MemStore::with(&[("theta", vec![0, 10, 20, 30, 40]), ("phi", vec![0, 10, 20])]);
    let explorer = Explorer::for_all(&mut store, Vec::new());
    let plan = explorer.plan(None).unwrap();
    assert_eq!(plan.len(), 15);
    // Name order: phi outer, theta inner.
    assert_eq!(plan[0], descriptor([("phi", 0), ("theta", 0)]));
    assert_eq!(plan[1], descriptor([("phi", 0), ("theta", 10)]));
    assert_eq!(plan[14], descriptor([("phi", 20), ("theta", 40)]));
}

#[test]
fn dependent_parameters_expand_only_when_unlocked() {
    let mut store = MemStore::with(&[
        ("shape", vec![0, 1]),
        ("radius", vec![5, 6, 7]),
        ("time", vec![0, 1]),
    ]);
    store
        .assign_parameter_dependence("radius", "shape", vec![Value::from(1)])
        .unwrap();
    let explorer = Explorer::for_all(&mut store, Vec::new());
    let plan = explorer.plan(None).unwrap();

    // shape=0: time only (2); shape=1: time x radius (6).
    assert_eq!(plan.len(), 8);
    let locked: Vec<_> = plan
        .iter()
        .filter(|d| d["shape"] == Value::from(0))
        .collect();
    assert_eq!(locked.len(), 2);
    assert!(locked.iter().all(|d| !d.contains_key("radius")));
    let unlocked: Vec<_> = plan
        .iter()
        .filter(|d| d["shape"] == Value::from(1))
        .collect();
    assert_eq!(unlocked.len(), 6);
    assert!(unlocked.iter().all(|d| d.contains_key("radius")));
}

#[test]
fn dependent_with_two_controllers_needs_both() {
    let mut store = MemStore::with(&[("a", vec![0, 1]), ("b", vec![0, 1]), ("c", vec![9, 8])]);
    store
        .assign_parameter_dependence("c", "a", vec![Value::from(1)])
        .unwrap();
    store
        .assign_parameter_dependence("c", "b", vec![Value::from(1)])
        .unwrap();
    let explorer = Explorer::for_all(&mut store, Vec::new());
    let plan = explorer.plan(None).unwrap();
    // (0,0) (0,1) (1,0) alone, (1,1) with both values of c.
    assert_eq!(plan.len(), 5);
    assert_eq!(plan.iter().filter(|d| d.contains_key("c")).count(), 2);
}

#[test]
fn fixedargs_are_overlaid_and_never_expanded() {
    let mut store = MemStore::with(&[("theta", vec![0, 10, 20]), ("phi", vec![0, 10])]);
    let explorer = Explorer::for_all(&mut store, Vec::new());
    let fixed = descriptor([("phi", 10)]);
    let plan = explorer.plan(Some(&fixed)).unwrap();
    assert_eq!(plan.len(), 3);
    assert!(plan.iter().all(|d| d["phi"] == Value::from(10)));
}

#[test]
fn fixedargs_can_unlock_dependents() {
    let mut store = MemStore::with(&[("shape", vec![0, 1]), ("radius", vec![5, 6])]);
    store
        .assign_parameter_dependence("radius", "shape", vec![Value::from(1)])
        .unwrap();
    let explorer = Explorer::for_all(&mut store, Vec::new());
    let fixed = descriptor([("shape", 1)]);
    let plan = explorer.plan(Some(&fixed)).unwrap();
    assert_eq!(
        plan,
        vec![
            descriptor([("radius", 5), ("shape", 1)]),
            descriptor([("radius", 6), ("shape", 1)]),
        ]
    );
}

#[test]
fn plan_iter_walks_large_spaces_lazily() {
    let axis: Vec<i64> = (0..100).collect();
    let params: Vec<(String, Vec<i64>)> = (0..8).map(|i| (format!("p{i}"), axis.clone())).collect();
    let borrowed: Vec<(&str, Vec<i64>)> =
        params.iter().map(|(n, v)| (n.as_str(), v.clone())).collect();
    let mut store = MemStore::with(&borrowed);
    store
        .assign_parameter_dependence("p7", "p0", vec![Value::from(0)])
        .unwrap();
    let explorer = Explorer::for_all(&mut store, Vec::new());

    let first: Vec<Descriptor> = explorer.plan_iter(None).unwrap().take(3).collect();
    assert_eq!(first.len(), 3);
    assert_eq!(first[0]["p6"], Value::from(0));
    // p0 = 0 unlocks p7, which then varies fastest.
    assert_eq!(first[1]["p7"], Value::from(1));
    assert_eq!(first[2]["p7"], Value::from(2));
}

#[test]
fn plan_collects_the_lazy_order() {
    let mut store = MemStore::with(&[
        ("shape", vec![0, 1]),
        ("radius", vec![5, 6, 7]),
        ("time", vec![0, 1]),
    ]);
    store
        .assign_parameter_dependence("radius", "shape", vec![Value::from(1)])
        .unwrap();
    let explorer = Explorer::for_all(&mut store, Vec::new());
    let lazy: Vec<Descriptor> = explorer.plan_iter(None).unwrap().collect();
    assert_eq!(lazy, explorer.plan(None).unwrap());
    assert_eq!(lazy.len(), 8);
}

#[test]
fn unknown_explored_parameter_is_schema_error() {
    let mut store = MemStore::with(&[("theta", vec![0])]);
    let explorer = Explorer::new(&mut store, names(&["theta", "nope"]), Vec::new());
    let err = explorer.plan(None).unwrap_err();
    assert!(matches!(err, CinemaError::Schema(_)));
}

#[test]
fn explore_inserts_every_planned_document() {
    let mut store = MemStore::with(&[("theta", vec![0, 10, 20, 30, 40]), ("phi", vec![0, 10, 20])]);
    let stats = Explorer::for_all(&mut store, vec![Box::new(DescriptorTrack)])
        .explore(None)
        .unwrap();
    assert_eq!(
        stats,
        ExploreStats {
            documents: 15,
            cancelled: false
        }
    );
    assert_eq!(store.docs.len(), 15);
    assert_eq!(store.flushes, 1);

    let hits: Vec<String> = store
        .find(&descriptor([("theta", 20)]))
        .unwrap()
        .map(|d| d.unwrap().text().unwrap().to_string())
        .collect();
    assert_eq!(
        hits,
        vec![
            "{'phi': 0, 'theta': 20}",
            "{'phi': 10, 'theta': 20}",
            "{'phi': 20, 'theta': 20}",
        ]
    );
}

#[test]
fn tracks_are_called_in_order() {
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }
    impl Track for Recorder {
        fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> CinemaResult<()> {
            self.log
                .borrow_mut()
                .push(format!("prepare {} {:?}", self.name, ctx.parameters));
            Ok(())
        }
        fn execute(&mut self, document: &mut Document) -> CinemaResult<()> {
            self.log.borrow_mut().push(format!(
                "execute {} {}",
                self.name,
                document.descriptor()["x"]
            ));
            Ok(())
        }
        fn finish(&mut self) -> CinemaResult<()> {
            self.log.borrow_mut().push(format!("finish {}", self.name));
            Ok(())
        }
    }

    let mut store = MemStore::with(&[("x", vec![1, 2])]);
    let tracks: Vec<Box<dyn Track>> = vec![
        Box::new(Recorder {
            name: "a",
            log: log.clone(),
        }),
        Box::new(Recorder {
            name: "b",
            log: log.clone(),
        }),
    ];
    Explorer::for_all(&mut store, tracks).explore(None).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "prepare a [\"x\"]",
            "prepare b [\"x\"]",
            "execute a 1",
            "execute b 1",
            "execute a 2",
            "execute b 2",
            "finish a",
            "finish b",
        ]
    );
}

#[test]
fn metadata_track_stamps_store_during_prepare() {
    let mut store = MemStore::with(&[("x", vec![1])]);
    Explorer::for_all(&mut store, vec![Box::new(MetadataTrack::image_stack())])
        .explore(None)
        .unwrap();
    let meta = store.metadata().unwrap();
    assert_eq!(meta["type"], "parametric-image-stack");
}

#[test]
fn failing_track_aborts_with_descriptor_context() {
    let mut store = MemStore::with(&[("x", vec![1, 2, 3])]);
    let finished = Rc::new(RefCell::new(false));
    struct Flag(Rc<RefCell<bool>>);
    impl Track for Flag {
        fn finish(&mut self) -> CinemaResult<()> {
            *self.0.borrow_mut() = true;
            Ok(())
        }
    }

    let failing = FnTrack::new(|doc: &mut Document| {
        if doc.descriptor()["x"] == Value::from(2) {
            return Err(CinemaError::payload("render failed"));
        }
        Ok(())
    });
    let err = Explorer::for_all(
        &mut store,
        vec![Box::new(failing), Box::new(Flag(finished.clone()))],
    )
    .explore(None)
    .unwrap_err();

    match err {
        CinemaError::Traversal { descriptor, source } => {
            assert_eq!(descriptor, "{'x': 2}");
            assert!(matches!(*source, CinemaError::Payload(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.docs.len(), 1);
    assert_eq!(store.flushes, 1);
    assert!(!*finished.borrow());
}

#[test]
fn insert_failure_propagates_after_flush() {
    let mut store = MemStore::with(&[("x", vec![1, 2, 3])]);
    store.fail_insert_at = Some(1);
    let err = Explorer::for_all(&mut store, Vec::new())
        .explore(None)
        .unwrap_err();
    assert!(matches!(err, CinemaError::Payload(_)));
    assert_eq!(store.docs.len(), 1);
    assert_eq!(store.flushes, 1);
}

#[test]
fn cancel_flag_stops_after_current_document() {
    let mut store = MemStore::with(&[("x", vec![1, 2, 3, 4])]);
    let cancel = Arc::new(AtomicBool::new(false));
    let trigger = cancel.clone();
    let track = FnTrack::new(move |doc: &mut Document| {
        if doc.descriptor()["x"] == Value::from(2) {
            trigger.store(true, Ordering::Relaxed);
        }
        Ok(())
    });
    let stats = Explorer::for_all(&mut store, vec![Box::new(track)])
        .with_opts(ExploreOpts {
            cancel: Some(cancel),
        })
        .explore(None)
        .unwrap();
    assert_eq!(
        stats,
        ExploreStats {
            documents: 2,
            cancelled: true
        }
    );
    assert_eq!(store.docs.len(), 2);
    assert_eq!(store.flushes, 1);
}

#[test]
fn explorer_reports_its_parameters() {
    let mut store = MemStore::with(&[("b", vec![1]), ("a", vec![1])]);
    let explorer = Explorer::for_all(&mut store, Vec::new());
    assert_eq!(explorer.list_parameters(), ["a", "b"]);
    assert_eq!(explorer.store().parameters().len(), 2);
}
