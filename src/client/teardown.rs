//! Process teardown hook

use tracing::{debug, warn};

use super::ClientModel;

/// Disconnects the client when dropped
///
/// Hold one for the lifetime of `main` so an active connection is shut down,
/// and `Shutdown` delivered, even on early returns.
///
/// Destructors do not run when a signal kills the process. Install a handler
/// (for example with `ctrlc`) that makes `main` return normally, or that calls
/// [`ClientModel::teardown`] directly; teardown is safe from any thread and a
/// second call is a no-op.
///
/// ```rust,no_run
/// use emoclient::{ClientConfig, ClientModel};
///
/// fn main() -> emoclient::Result<()> {
///     let client = ClientModel::new(ClientConfig::default())?;
///     let _teardown = client.teardown_guard();
///     client.connect()?;
///     // ...
///     Ok(())
/// }
/// ```
#[must_use = "the connection is only torn down when the guard is dropped"]
pub struct TeardownGuard {
    client: ClientModel,
}

impl TeardownGuard {
    pub(crate) fn new(client: ClientModel) -> Self {
        Self { client }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        debug!("Running client teardown");
        if let Err(e) = self.client.teardown() {
            warn!("Client teardown failed: {}", e);
        }
    }
}
