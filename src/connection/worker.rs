//! Connection worker owning the receive thread

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::PacketSink;
use super::driver;
use crate::provider::Provider;
use crate::{ClientError, Result};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to one connection's receive thread
///
/// The thread runs a single-threaded tokio runtime. It connects, reports
/// readiness, waits to be released, then runs the receive loop until the
/// token is cancelled or the connection fails.
pub struct ConnectionWorker {
    generation: u64,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    release: Option<oneshot::Sender<()>>,
}

/// Readiness report from a freshly started worker
///
/// Kept apart from [`ConnectionWorker`] so the handle can be published while
/// the caller waits.
pub struct Startup {
    generation: u64,
    ready: mpsc::Receiver<Result<String>>,
}

impl Startup {
    /// Block until the worker is connected or has failed to connect
    ///
    /// Returns the peer description on success. The worker is not cancelled
    /// on timeout; drop or shut down its handle for that.
    pub fn wait(self, timeout: Duration) -> Result<String> {
        match self.ready.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                debug!(generation = self.generation, ?timeout, "Worker did not report in time");
                Err(ClientError::Timeout { duration: timeout })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ClientError::connection_failed("receive thread exited during startup"))
            }
        }
    }
}

impl ConnectionWorker {
    /// Spawn the receive thread
    ///
    /// Returns as soon as the thread exists; use [`Startup::wait`] to learn
    /// whether the connection came up.
    pub fn start<P, F, Fut>(
        generation: u64,
        sink: Arc<dyn PacketSink>,
        connect: F,
    ) -> Result<(Self, Startup)>
    where
        P: Provider,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<P>>,
    {
        let cancel = CancellationToken::new();
        let running = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (release_tx, release_rx) = oneshot::channel();

        let thread_cancel = cancel.clone();
        let thread_running = Arc::clone(&running);

        let thread = thread::Builder::new().name("emoclient-rx".to_string()).spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(ClientError::Io(e)));
                    return;
                }
            };

            runtime.block_on(async move {
                let provider = tokio::select! {
                    biased;
                    _ = thread_cancel.cancelled() => {
                        let _ = ready_tx.send(Err(ClientError::connection_failed("cancelled while connecting")));
                        return;
                    }
                    result = connect() => match result {
                        Ok(provider) => provider,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    },
                };

                thread_running.store(true, Ordering::SeqCst);
                if ready_tx.send(Ok(provider.peer())).is_err() {
                    thread_running.store(false, Ordering::SeqCst);
                    return;
                }

                let released = tokio::select! {
                    biased;
                    _ = thread_cancel.cancelled() => false,
                    result = release_rx => result.is_ok(),
                };

                let exit = if released {
                    driver::run(provider, &*sink, &thread_cancel).await
                } else {
                    driver::DriverExit::Cancelled
                };

                thread_running.store(false, Ordering::SeqCst);

                if let Some(reason) = exit.loss_reason() {
                    sink.connection_lost(generation, reason);
                }
            });

            debug!(generation, "Receive thread exiting");
        })?;

        let worker = Self {
            generation,
            cancel,
            running,
            thread: Some(thread),
            release: Some(release_tx),
        };
        Ok((worker, Startup { generation, ready: ready_rx }))
    }

    /// Let the receive loop start delivering packets
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }

    /// Request loop termination
    ///
    /// Any pending read is abandoned and the socket closed; this does not wait.
    pub fn shutdown(&self) {
        debug!(generation = self.generation, "Cancelling receive loop");
        self.cancel.cancel();
    }

    /// Whether the loop is connected and processing
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the caller is running on this worker's receive thread
    pub fn is_current_thread(&self) -> bool {
        self.thread.as_ref().is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    /// Poll for the loop to stop, joining the thread if it does
    ///
    /// Returns `false` if the timeout elapsed first; the thread is then left
    /// detached.
    pub fn wait_stopped(&mut self, timeout: Duration) -> bool {
        if self.is_current_thread() {
            return false;
        }

        let deadline = Instant::now() + timeout;
        while self.is_running() {
            if Instant::now() >= deadline {
                warn!(generation = self.generation, ?timeout, "Receive thread did not stop in time");
                return false;
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }

        // The running flag drops just before the thread finishes; bound the join too
        if let Some(handle) = self.thread.take() {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    warn!(generation = self.generation, "Receive thread still finishing, detaching");
                    return true;
                }
                thread::sleep(STOP_POLL_INTERVAL);
            }
            if handle.join().is_err() {
                warn!(generation = self.generation, "Receive thread panicked");
            }
        }

        info!(generation = self.generation, "Receive thread stopped");
        true
    }
}

impl Drop for ConnectionWorker {
    fn drop(&mut self) {
        // Cancel on drop for clean shutdown
        self.cancel.cancel();
    }
}
