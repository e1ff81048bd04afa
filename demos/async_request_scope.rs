use scoped_handles::{
    BoxError, HandleFactory, HandleProvider, LifecycleError, LifecycleOptions, PrimaryHandle, StatelessHandle,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Connection {
    id: usize,
}

impl PrimaryHandle for Connection {
    fn is_open(&self) -> bool {
        true
    }

    fn flush(&self) -> Result<(), BoxError> {
        tracing::info!(connection = self.id, "committing");
        Ok(())
    }

    fn release(&self) {
        tracing::info!(connection = self.id, "returned to pool");
    }
}

struct Replica;

impl StatelessHandle for Replica {
    fn release(&self) {}
}

/// Opening a connection blocks, so it must stay off the async workers.
struct SlowPool {
    opened: AtomicUsize,
}

impl HandleFactory for SlowPool {
    type Primary = Connection;
    type Stateless = Replica;

    fn make_primary(&self) -> Result<Connection, BoxError> {
        std::thread::sleep(Duration::from_millis(50));
        let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Connection { id })
    }

    fn make_stateless(&self) -> Result<Replica, BoxError> {
        Ok(Replica)
    }
}

#[tokio::main]
async fn main() -> Result<(), LifecycleError> {
    tracing_subscriber::fmt::init();

    let provider = HandleProvider::new(SlowPool {
        opened: AtomicUsize::new(0),
    })
    .with_options(LifecycleOptions::default().with_flush_on_close(true));

    for request in 0..3 {
        let ids = provider
            .using_async(|manager| async move {
                let tasks: Vec<_> = (0..4)
                    .map(|_| {
                        let manager = manager.clone();
                        tokio::spawn(async move { manager.primary_async().await.map(|c| c.id) })
                    })
                    .collect();

                let mut ids = Vec::new();
                for task in tasks {
                    match task.await {
                        Ok(id) => ids.push(id?),
                        Err(err) => tracing::error!(error = %err, "task failed"),
                    }
                }
                Ok::<_, LifecycleError>(ids)
            })
            .await?;

        println!("request {} used connection(s) {:?}", request, ids);
    }

    println!(
        "connections opened: {}",
        provider.factory().opened.load(Ordering::SeqCst)
    );
    Ok(())
}
