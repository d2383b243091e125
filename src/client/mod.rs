//! Client model: connection lifecycle, packet buffering, and notification.
//!
//! [`ClientModel`] is a cheap handle to shared state. Build one at startup and
//! pass clones to every consumer, or use [`ClientModel::global`] for a
//! process-wide instance.
//!
//! ## Locking
//!
//! - The packet store sits behind an `RwLock`; listeners run after the write
//!   lock is released, so they can read buffers from inside a callback.
//! - An ingest gate serializes each "mutate, then notify" pair so listeners
//!   see data events in the order the mutations happened.
//! - The worker slot is locked only for short checks. `connect` publishes a
//!   pending worker before waiting for it, so `disconnect` can cancel it.
//! - A reentrant lifecycle gate covers announcing `Started` and taking the
//!   worker on disconnect, so `Shutdown` never overtakes `Started`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use emoclient::{ClientConfig, ClientEvent, ClientModel, Expression};
//!
//! # fn main() -> emoclient::Result<()> {
//! let client = ClientModel::new(ClientConfig::default())?;
//!
//! let reader = client.clone();
//! client.subscribe(move |event: &ClientEvent| {
//!     if let ClientEvent::ValuesAdded { tick } = event {
//!         let smile = reader.expression_buffer(Expression::Smile);
//!         println!("tick {tick}: {} smile samples", smile.len());
//!     }
//! });
//!
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

mod listeners;
mod teardown;

pub use listeners::{Listener, ListenerId};
pub use teardown::TeardownGuard;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::ReentrantMutex;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

use crate::config::{validate_host, validate_port};
use crate::connection::{ConnectionWorker, PacketSink};
use crate::providers::TcpProvider;
use crate::types::{
    ChannelId, ClientEvent, Emotion, EmostatePacket, Expression, PacketStore, ShutdownReason,
    ValueTuple,
};
use crate::{ClientConfig, ClientError, DEFAULT_HOST, Result};
use listeners::{ListenerRegistry, StreamListener};

/// Slack on top of the connect timeout for the worker thread to report back
const STARTUP_MARGIN: Duration = Duration::from_millis(250);

/// Whether a worker is connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// `connect` is waiting for the worker to come up
    Connecting,
    Connected,
}

/// What happened to the worker thread after a disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopOutcome {
    Stopped,
    TimedOut,
    /// Disconnect was called from the worker's own thread
    Deferred,
}

/// Opens the provider for one connection attempt
pub(crate) type Connector =
    Arc<dyn Fn(String, u16, ClientConfig) -> BoxFuture<'static, Result<TcpProvider>> + Send + Sync>;

fn tcp_connector() -> Connector {
    Arc::new(
        |host: String, port: u16, config: ClientConfig| -> BoxFuture<'static, Result<TcpProvider>> {
            Box::pin(async move { TcpProvider::connect(&host, port, &config).await })
        },
    )
}

/// Shared client handle
#[derive(Clone)]
pub struct ClientModel {
    inner: Arc<Inner>,
}

struct Endpoint {
    host: String,
    port: u16,
}

/// The current worker and whether `Started` has gone out for it
struct WorkerSlot {
    worker: ConnectionWorker,
    announced: bool,
}

struct Inner {
    config: ClientConfig,
    connector: Connector,
    endpoint: Mutex<Endpoint>,
    worker: Mutex<Option<WorkerSlot>>,
    lifecycle: ReentrantMutex<()>,
    generation: AtomicU64,
    store: RwLock<PacketStore>,
    ingest_gate: Mutex<()>,
    listeners: ListenerRegistry,
}

impl ClientModel {
    /// Create a client for the configured server
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config, tcp_connector()))
    }

    #[cfg(test)]
    pub(crate) fn with_connector(config: ClientConfig, connector: Connector) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config, connector))
    }

    fn from_valid_config(config: ClientConfig, connector: Connector) -> Self {
        let endpoint = Endpoint { host: config.host.clone(), port: config.port };
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                endpoint: Mutex::new(endpoint),
                worker: Mutex::new(None),
                lifecycle: ReentrantMutex::new(()),
                generation: AtomicU64::new(0),
                store: RwLock::new(PacketStore::new()),
                ingest_gate: Mutex::new(()),
                listeners: ListenerRegistry::default(),
            }),
        }
    }

    /// Process-wide client using the default configuration
    ///
    /// Constructed at most once, even under concurrent first access.
    pub fn global() -> &'static ClientModel {
        static GLOBAL: OnceLock<ClientModel> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::from_valid_config(ClientConfig::default(), tcp_connector()))
    }

    /// Start receiving packets
    ///
    /// Blocks until the worker is connected, then fires `Started`. Fails with
    /// [`ClientError::AlreadyConnected`] if a worker is running or still
    /// connecting, or with a connection error if the server cannot be reached;
    /// neither fires an event. A `disconnect` from another thread while this
    /// waits cancels the attempt, which then fails without events.
    pub fn connect(&self) -> Result<()> {
        let (generation, startup) = {
            let mut slot = lock(&self.inner.worker);
            if let Some(existing) = slot.as_ref() {
                if !existing.announced || existing.worker.is_running() {
                    return Err(ClientError::AlreadyConnected);
                }
                debug!(generation = existing.worker.generation(), "Discarding stopped worker");
                *slot = None;
            }

            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let (host, port) = {
                let endpoint = lock(&self.inner.endpoint);
                (endpoint.host.clone(), endpoint.port)
            };
            let config = self.inner.config.clone();
            let connector = Arc::clone(&self.inner.connector);
            let sink: Arc<dyn PacketSink> =
                Arc::new(WorkerSink { inner: Arc::downgrade(&self.inner), generation });

            let (worker, startup) =
                ConnectionWorker::start(generation, sink, move || connector(host, port, config))?;
            *slot = Some(WorkerSlot { worker, announced: false });
            (generation, startup)
        };

        let peer = match startup.wait(self.inner.config.connect_timeout() + STARTUP_MARGIN) {
            Ok(peer) => peer,
            Err(e) => {
                self.inner.discard_pending(generation);
                warn!(generation, "Failed to start client: {}", e);
                return Err(e);
            }
        };

        let _lifecycle = self.inner.lifecycle.lock();
        if !self.inner.mark_announced(generation) {
            info!(generation, "Connect cancelled by disconnect");
            return Err(ClientError::connection_failed("disconnected while connecting"));
        }

        info!(generation, %peer, "Client started and connected to server");
        self.inner.listeners.notify(&ClientEvent::Started { peer });

        // Packets only flow once every listener has seen `Started`
        if let Some(slot) = lock(&self.inner.worker).as_mut() {
            if slot.worker.generation() == generation {
                slot.worker.release();
            }
        }
        Ok(())
    }

    /// Stop receiving packets
    ///
    /// Cancels the worker, waits a bounded time for its thread to exit, and
    /// fires `Shutdown`. Fails with [`ClientError::AlreadyDisconnected`] when
    /// there is no worker. Cancelling a connect that has not come up yet
    /// fires nothing.
    pub fn disconnect(&self) -> Result<()> {
        self.stop().map(|_| ())
    }

    fn stop(&self) -> Result<StopOutcome> {
        let WorkerSlot { mut worker, announced } = {
            let _lifecycle = self.inner.lifecycle.lock();
            lock(&self.inner.worker).take().ok_or(ClientError::AlreadyDisconnected)?
        };
        worker.shutdown();

        let outcome = if worker.is_current_thread() {
            debug!(generation = worker.generation(), "Disconnect from receive thread, not waiting");
            StopOutcome::Deferred
        } else if worker.wait_stopped(self.inner.config.stop_timeout()) {
            StopOutcome::Stopped
        } else {
            StopOutcome::TimedOut
        };
        let generation = worker.generation();
        drop(worker);

        if !announced {
            info!(generation, ?outcome, "Pending connect cancelled");
            return Ok(outcome);
        }

        info!(generation, ?outcome, "Client disconnected");
        self.inner
            .listeners
            .notify(&ClientEvent::Shutdown { reason: ShutdownReason::Requested });
        Ok(outcome)
    }

    /// Disconnect if connected; used at process exit
    pub fn teardown(&self) -> Result<()> {
        match self.disconnect() {
            Ok(()) | Err(ClientError::AlreadyDisconnected) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Guard that calls [`ClientModel::teardown`] when dropped
    ///
    /// See [`TeardownGuard`] for exits that skip destructors.
    pub fn teardown_guard(&self) -> TeardownGuard {
        TeardownGuard::new(self.clone())
    }

    /// Whether a worker exists and reports itself running
    pub fn is_connected(&self) -> bool {
        lock(&self.inner.worker)
            .as_ref()
            .is_some_and(|slot| slot.announced && slot.worker.is_running())
    }

    pub fn connection_state(&self) -> ConnectionState {
        match lock(&self.inner.worker).as_ref() {
            Some(slot) if !slot.announced => ConnectionState::Connecting,
            Some(slot) if slot.worker.is_running() => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Change the server host
    ///
    /// When connected this disconnects, waits for the worker to stop, and
    /// reconnects to the new host. A stop timeout is logged and ignored.
    pub fn set_host(&self, host: impl Into<String>) -> Result<()> {
        let host = host.into();
        validate_host(&host)?;

        if !self.is_connected() {
            lock(&self.inner.endpoint).host = host;
            return Ok(());
        }

        info!(%host, "Changing host, reconnecting");
        match self.stop() {
            Ok(StopOutcome::TimedOut) => {
                warn!("Previous worker did not stop in time, continuing with new host")
            }
            Ok(_) => {}
            // Lost between the check and the stop; reconnect regardless
            Err(ClientError::AlreadyDisconnected) => {}
            Err(e) => return Err(e),
        }

        lock(&self.inner.endpoint).host = host;
        self.connect()
    }

    /// Point the client back at [`DEFAULT_HOST`]
    pub fn set_host_to_localhost(&self) -> Result<()> {
        self.set_host(DEFAULT_HOST)
    }

    /// Change the server port; applies to the next connect
    ///
    /// Port `0` is rejected with [`ClientError::InvalidArgument`]; it cannot
    /// name a server.
    pub fn set_port(&self, port: u16) -> Result<()> {
        validate_port(port)?;
        let mut endpoint = lock(&self.inner.endpoint);
        if endpoint.port != port {
            debug!(port, "Port changed");
            endpoint.port = port;
        }
        Ok(())
    }

    pub fn host(&self) -> String {
        lock(&self.inner.endpoint).host.clone()
    }

    pub fn port(&self) -> u16 {
        lock(&self.inner.endpoint).port
    }

    /// Register a listener; events are delivered in registration order
    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    /// Register a closure as a listener
    pub fn subscribe<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(f))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Events as an async stream
    ///
    /// The stream unregisters itself once dropped.
    pub fn event_stream(&self) -> UnboundedReceiverStream<ClientEvent> {
        let (listener, stream) = StreamListener::channel();
        self.add_listener(Arc::new(listener));
        stream
    }

    /// Apply a packet to the buffers
    ///
    /// A tick earlier than the newest packet's starts a new session: buffers are
    /// reset (firing `ValuesReset`) before the packet is appended.
    ///
    /// Must not be called from a listener handling a data event; the ingest
    /// gate is held while those listeners run.
    pub fn ingest(&self, packet: EmostatePacket) {
        self.inner.ingest(packet, None);
    }

    /// Clear all buffers and the newest packet
    ///
    /// Same reentrancy restriction as [`ClientModel::ingest`].
    pub fn reset_packets(&self) {
        let _gate = lock(&self.inner.ingest_gate);
        write(&self.inner.store).clear();
        self.inner.notify_reset();
    }

    /// Snapshot of every packet since the last reset
    pub fn packets(&self) -> Vec<Arc<EmostatePacket>> {
        read(&self.inner.store).packets().to_vec()
    }

    /// Snapshot of one channel's samples
    pub fn channel_buffer(&self, channel: impl Into<ChannelId>) -> Vec<ValueTuple> {
        read(&self.inner.store).buffer(channel).to_vec()
    }

    pub fn expression_buffer(&self, expression: Expression) -> Vec<ValueTuple> {
        self.channel_buffer(expression)
    }

    pub fn emotion_buffer(&self, emotion: Emotion) -> Vec<ValueTuple> {
        self.channel_buffer(emotion)
    }

    pub fn newest_packet(&self) -> Option<Arc<EmostatePacket>> {
        read(&self.inner.store).newest().cloned()
    }

    pub fn packets_count(&self) -> usize {
        read(&self.inner.store).len()
    }

    /// Borrow the store without copying
    ///
    /// Ingestion is blocked while `f` runs, so keep it short.
    pub fn with_store<R>(&self, f: impl FnOnce(&PacketStore) -> R) -> R {
        f(&read(&self.inner.store))
    }
}

impl Inner {
    /// Apply a packet, optionally only if `generation` is still the active worker
    fn ingest(&self, packet: EmostatePacket, generation: Option<u64>) {
        let _gate = lock(&self.ingest_gate);
        let tick = packet.tick();
        let packet = Arc::new(packet);

        let restarted_from = self.mutate_store(generation, |store| {
            let previous = store.newest().map(|p| p.tick()).filter(|_| store.is_restart(tick));
            if previous.is_some() {
                store.clear();
            }
            previous
        });

        match restarted_from {
            None => return,
            Some(Some(previous)) => {
                info!(previous, tick, "Tick went backwards, starting a new session");
                self.notify_reset();
            }
            Some(None) => {}
        }

        if self.mutate_store(generation, |store| store.append(Arc::clone(&packet))).is_none() {
            return;
        }

        self.listeners.notify(&ClientEvent::ValuesAdded { tick });
        self.listeners.notify(&ClientEvent::ValuesChanged);
    }

    /// Run `f` on the store, holding the worker slot so a disconnect cannot interleave
    ///
    /// Returns `None` without running `f` if `generation` is no longer active.
    fn mutate_store<R>(
        &self,
        generation: Option<u64>,
        f: impl FnOnce(&mut PacketStore) -> R,
    ) -> Option<R> {
        let slot = generation.map(|_| lock(&self.worker));
        if let (Some(generation), Some(slot)) = (generation, &slot) {
            match &**slot {
                Some(current) if current.worker.generation() == generation => {}
                _ => {
                    debug!(generation, "Dropping packet from a stopped worker");
                    return None;
                }
            }
        }
        Some(f(&mut write(&self.store)))
    }

    /// Drop the pending worker of a failed connect, if it is still ours
    fn discard_pending(&self, generation: u64) {
        let mut slot = lock(&self.worker);
        if slot.as_ref().is_some_and(|current| current.worker.generation() == generation) {
            // Dropping the handle cancels the thread
            *slot = None;
        }
    }

    /// Flag the worker as announced; false if a disconnect already took it
    fn mark_announced(&self, generation: u64) -> bool {
        match lock(&self.worker).as_mut() {
            Some(current) if current.worker.generation() == generation => {
                current.announced = true;
                true
            }
            _ => false,
        }
    }

    fn notify_reset(&self) {
        self.listeners.notify(&ClientEvent::ValuesReset);
        self.listeners.notify(&ClientEvent::ValuesChanged);
    }

    fn connection_lost(&self, generation: u64, reason: String) {
        let lost = {
            let mut slot = lock(&self.worker);
            match slot.as_ref() {
                Some(current) if current.worker.generation() == generation => slot.take(),
                _ => None,
            }
        };

        // Stale workers are already accounted for
        let Some(current) = lost else {
            return;
        };
        drop(current);

        error!(generation, %reason, "Connection lost");
        self.listeners.notify(&ClientEvent::Shutdown { reason: ShutdownReason::ConnectionLost(reason) });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        debug!("Dropping client model");
        if let Some(current) = lock(&self.worker).take() {
            current.worker.shutdown();
        }
    }
}

/// Sink handed to one worker generation
struct WorkerSink {
    inner: Weak<Inner>,
    generation: u64,
}

impl PacketSink for WorkerSink {
    fn ingest(&self, packet: EmostatePacket) -> Result<()> {
        let inner = self
            .inner
            .upgrade()
            .ok_or_else(|| ClientError::connection_failed("client model dropped"))?;
        inner.ingest(packet, Some(self.generation));
        Ok(())
    }

    fn connection_lost(&self, generation: u64, reason: String) {
        if let Some(inner) = self.inner.upgrade() {
            inner.connection_lost(generation, reason);
        }
    }
}

// A panicking listener must not wedge the client, so poisoned locks are recovered.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
