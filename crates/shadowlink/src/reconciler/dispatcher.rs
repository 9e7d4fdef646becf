use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::Reconciler;
use crate::catalog::Catalog;
use crate::gateway::ActuatorGateway;
use crate::shadow::DeltaReceiver;
use crate::shadow::ShadowDelta;
use crate::shadow::ShadowStore;

struct Worker {
    tx: mpsc::UnboundedSender<ShadowDelta>,
    handle: JoinHandle<()>,
}

/// Fans deltas out to one worker task per appliance.
///
/// Each worker owns the appliance's [`Reconciler`] and drains its queue in
/// order, so deltas for one appliance are handled strictly in arrival order
/// while different appliances proceed in parallel. Workers are started on the
/// first delta for their appliance.
///
/// Worker queues are unbounded: `dispatch` never waits on a slow appliance,
/// so one stuck actuator cannot hold up deltas for the others or the store
/// task feeding the dispatcher.
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    shadow: Arc<dyn ShadowStore>,
    gateway: Arc<dyn ActuatorGateway>,
    actuator_timeout: Duration,
    workers: HashMap<String, Worker>,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<Catalog>,
        shadow: Arc<dyn ShadowStore>,
        gateway: Arc<dyn ActuatorGateway>,
        actuator_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            shadow,
            gateway,
            actuator_timeout,
            workers: HashMap::new(),
        }
    }

    /// Queue a delta on its appliance's worker without waiting for it to be
    /// handled.
    pub async fn dispatch(&mut self, delta: ShadowDelta) {
        let Some(appliance) = self.catalog.lookup(&delta.thing) else {
            warn!("Ignoring delta for unknown thing {}", delta.thing);
            return;
        };

        if !self.workers.contains_key(&appliance.id) {
            let mut reconciler = Reconciler::new(
                appliance.clone(),
                self.shadow.clone(),
                self.gateway.clone(),
                self.actuator_timeout,
            );
            let (tx, mut rx) = mpsc::unbounded_channel::<ShadowDelta>();
            let id = appliance.id.clone();

            let handle = tokio::spawn(async move {
                while let Some(delta) = rx.recv().await {
                    reconciler.handle(&delta).await;
                }
                debug!("Reconciler for {} exiting", id);
            });

            self.workers
                .insert(appliance.id.clone(), Worker { tx, handle });
        }

        if let Some(worker) = self.workers.get(&appliance.id) {
            if let Err(e) = worker.tx.send(delta) {
                warn!("Reconciler for {} is gone: {}", e.0.thing, e);
            }
        }
    }

    /// Dispatch every delta from `deltas` until the store closes the channel.
    pub async fn run(mut self, mut deltas: DeltaReceiver) {
        info!("Reconciler dispatcher starting");

        while let Some(delta) = deltas.recv().await {
            self.dispatch(delta).await;
        }

        info!("Delta channel closed, draining reconcilers");
        self.shutdown().await;
    }

    /// Close every worker queue and wait for queued deltas to be handled.
    pub async fn shutdown(self) {
        for (id, worker) in self.workers {
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                warn!("Reconciler for {} panicked: {}", id, e);
            }
        }
    }
}
