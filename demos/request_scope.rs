use scoped_handles::{
    BoxError, ConfigProvider, HandleFactory, HandleProvider, LifecycleError, MetricsObserver, PrimaryHandle,
    StatelessHandle,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

// ===== In-memory store =====

#[derive(Default)]
struct Store {
    rows: Mutex<HashMap<u32, String>>,
}

/// Buffers writes until flushed.
struct Session {
    store: Arc<Store>,
    pending: Mutex<Vec<(u32, String)>>,
    open: AtomicBool,
}

impl Session {
    fn insert(&self, id: u32, value: &str) {
        self.pending.lock().unwrap().push((id, value.to_string()));
    }
}

impl PrimaryHandle for Session {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn flush(&self) -> Result<(), BoxError> {
        let mut pending = self.pending.lock().unwrap();
        if pending.iter().any(|(_, value)| value.is_empty()) {
            return Err("empty values are rejected by the store".into());
        }
        self.store.rows.lock().unwrap().extend(pending.drain(..));
        Ok(())
    }

    fn release(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Reads committed rows directly.
struct Reader {
    store: Arc<Store>,
}

impl Reader {
    fn get(&self, id: u32) -> Option<String> {
        self.store.rows.lock().unwrap().get(&id).cloned()
    }
}

impl StatelessHandle for Reader {
    fn release(&self) {}
}

struct StoreFactory {
    store: Arc<Store>,
}

impl HandleFactory for StoreFactory {
    type Primary = Session;
    type Stateless = Reader;

    fn make_primary(&self) -> Result<Session, BoxError> {
        Ok(Session {
            store: self.store.clone(),
            pending: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
        })
    }

    fn make_stateless(&self) -> Result<Reader, BoxError> {
        Ok(Reader {
            store: self.store.clone(),
        })
    }
}

fn main() -> Result<(), LifecycleError> {
    tracing_subscriber::fmt()
        .with_env_filter("scoped_handles=debug,info")
        .init();

    let store = Arc::new(Store::default());
    let metrics = Arc::new(MetricsObserver::new());

    // DEMO_LIFECYCLE_FLUSH_ON_CLOSE=false turns implicit commits off
    let mut config = ConfigProvider::from_env("DEMO");
    config.add_source(Box::new(
        scoped_handles::MapConfigSource::new().with("lifecycle.flush_on_close", true),
    ));
    let provider = HandleProvider::from_config(StoreFactory { store: store.clone() }, &config)?
        .with_observer(metrics.clone());

    println!("=== Request 1: two workers share one session ===");
    provider.using(|manager| {
        thread::scope(|s| {
            let workers: Vec<_> = (0..2u32)
                .map(|worker| {
                    s.spawn(move || -> Result<(), LifecycleError> {
                        let session = manager.primary()?;
                        session.insert(worker, &format!("order-{}", worker));
                        Ok(())
                    })
                })
                .collect();
            workers
                .into_iter()
                .try_for_each(|worker| worker.join().expect("worker panicked"))
        })
    })?;

    println!("=== Request 2: read what request 1 committed ===");
    let order = provider.using(|manager| Ok::<_, LifecycleError>(manager.stateless()?.get(1)))?;
    println!("order 1 = {:?}", order);

    println!("=== Request 3: flush fails, the request still succeeds ===");
    provider.using(|manager| {
        manager.primary()?.insert(9, "");
        Ok::<_, LifecycleError>(())
    })?;

    println!("=== Metrics ===");
    print!("{}", metrics.export_prometheus());
    Ok(())
}
