use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use hostbridge_core::{di::DynError, CancellationToken, Host, HostBridgeError};
use tokio::{runtime::Handle, task::JoinHandle};

/// Exit code reported when the service failed with an exception
pub const EXIT_CODE_EXCEPTION_IN_SERVICE: i32 = 1064;

/// Builds the host when the service starts
pub trait HostFactory: Send + Sync {
    fn build_host(&self) -> Result<Arc<dyn Host>, DynError>;
}

impl<F> HostFactory for F
where
    F: Fn() -> Result<Arc<dyn Host>, DynError> + Send + Sync,
{
    fn build_host(&self) -> Result<Arc<dyn Host>, DynError> {
        self()
    }
}

#[derive(Default)]
struct Running {
    host: Option<Arc<dyn Host>>,
    startup: Option<JoinHandle<Result<(), HostBridgeError>>>,
}

/// Owns the host of one service between its start and stop callbacks.
///
/// The callbacks block on `runtime`, so they must be called from outside of it.
pub struct ServiceHostBase {
    service_name: String,
    factory: Box<dyn HostFactory>,
    runtime: Handle,
    running: Mutex<Running>,
    exit_code: AtomicI32,
}

impl ServiceHostBase {
    pub fn new(
        service_name: impl Into<String>,
        factory: impl HostFactory + 'static,
        runtime: Handle,
    ) -> Self {
        ServiceHostBase {
            service_name: service_name.into(),
            factory: Box::new(factory),
            runtime,
            running: Mutex::new(Running::default()),
            exit_code: AtomicI32::new(0),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.lock().host.is_some()
    }

    /// Builds the host and starts it in the background.
    ///
    /// Repeated starts are ignored. A failing build is returned and sets the exit code; a
    /// failing start is only logged.
    pub fn on_start(&self, args: &[String]) -> Result<(), DynError> {
        let mut running = self.lock();
        if running.host.is_some() {
            return Ok(());
        }

        let host = match self.factory.build_host() {
            Ok(host) => host,
            Err(e) => {
                tracing::error!(service = %self.service_name, "Service start failed: {}", e);
                self.exit_code
                    .store(EXIT_CODE_EXCEPTION_IN_SERVICE, Ordering::SeqCst);
                return Err(e);
            }
        };
        tracing::info!(service = %self.service_name, ?args, "Service starting");

        let starting = host.clone();
        let service_name = self.service_name.clone();
        running.startup = Some(self.runtime.spawn(async move {
            let started = starting.start(&CancellationToken::new()).await;
            if let Err(e) = &started {
                tracing::error!(service = %service_name, "Host start faulted: {}", e);
            }
            started
        }));
        running.host = Some(host);
        Ok(())
    }

    pub fn on_stop(&self) {
        self.stop_host();
    }

    pub fn on_shutdown(&self) {
        self.stop_host();
    }

    /// Stops and disposes the host. Nothing escapes: failures are logged.
    fn stop_host(&self) {
        let Running { host, startup } = std::mem::take(&mut *self.lock());
        let Some(host) = host else {
            return;
        };

        if let Some(startup) = startup.filter(JoinHandle::is_finished) {
            match self.runtime.block_on(startup) {
                Ok(Err(e)) => tracing::warn!(
                    service = %self.service_name,
                    "Stopping a host whose start failed: {}",
                    e
                ),
                Err(e) => {
                    tracing::error!(service = %self.service_name, "Host start task failed: {}", e)
                }
                Ok(Ok(())) => {}
            }
        }

        let token = CancellationToken::cancelled_token();
        if let Err(e) = self.runtime.block_on(host.stop(&token)) {
            tracing::error!(service = %self.service_name, "Service stop failed: {}", e);
        }
        if catch_unwind(AssertUnwindSafe(|| host.dispose())).is_err() {
            tracing::error!(service = %self.service_name, "Host dispose panicked");
        }
        tracing::info!(service = %self.service_name, "Service stopped");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Running> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
