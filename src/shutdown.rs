use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Debug, Clone, Copy)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    pub fn description(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT (Ctrl+C) received",
            ShutdownSignal::Terminate => "SIGTERM received (likely from systemctl)",
        }
    }
}

/// Flag raised once SIGINT or SIGTERM arrives.
///
/// The run loop is synchronous, so the signals are awaited on a small tokio
/// runtime living on its own thread.
#[derive(Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn install() -> Result<Self, Box<dyn std::error::Error>> {
        let flag = ShutdownFlag::default();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()?;

        let raised = flag.clone();
        thread::Builder::new()
            .name("shutdown-signals".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    match wait_for_shutdown_signal().await {
                        Ok(received) => info!("{}", received.description()),
                        Err(e) => error!("Failed to listen for shutdown signals: {}", e),
                    }
                    raised.request();
                })
            })?;

        Ok(flag)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigint.recv() => Ok(ShutdownSignal::Interrupt),
        _ = sigterm.recv() => Ok(ShutdownSignal::Terminate),
    }
}
