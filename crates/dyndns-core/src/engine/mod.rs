//! Core reconcile engine
//!
//! The DdnsEngine is responsible for:
//! - Reading the published A/AAAA values once at startup
//! - Resolving the current public addresses every iteration
//! - Diffing and upserting only the changed families
//! - Sleeping a jittered interval between iterations
//!
//! ## Architecture
//!
//! ```text
//!  ┌─────────────────┐   observed    ┌──────────────┐   ChangeSet   ┌──────────────┐
//!  │ AddressResolver │──────────────▶│  DdnsEngine  │──────────────▶│ Zone (upsert)│
//!  └─────────────────┘               │  published   │◀──────────────│ ZoneProvider │
//!                                    └──────────────┘   startup read└──────────────┘
//!                                           │
//!                                           ▼
//!                                    EngineEvent channel
//! ```
//!
//! ## States
//!
//! The engine alternates between **Idle** (sleeping) and **Reconciling**
//! ([`DdnsEngine::reconcile`]). A reconciliation returns an [`Outcome`]; the
//! outer loop in [`DdnsEngine::run`] decides whether to keep going.
//!
//! `published` only advances after the provider accepted a batch, so a failed
//! write is retried on the next iteration with the same diff.

mod jitter;

pub use jitter::Jitter;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::address::{AddressPair, ChangeSet};
use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::traits::{AddressResolver, IpFamily, RecordType, ZoneProvider};
use crate::zone::Zone;

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { domain: String },

    /// Published records read at startup
    ExistingRecords { published: AddressPair },

    /// Addresses resolved for this iteration
    AddressesObserved { observed: AddressPair },

    /// Nothing to write this iteration
    UpdateSkipped { published: AddressPair },

    /// Change batch accepted by the provider
    UpdateSucceeded { written: ChangeSet, change_id: String },

    /// Change batch failed after all retries
    UpdateFailed { error: String, retry_count: usize },

    /// Engine stopped
    Stopped { reason: String },
}

/// Result of one reconciliation
#[derive(Debug)]
pub enum Outcome {
    /// Sleep and reconcile again
    Continue,
    /// Stop the loop
    Halt(HaltReason),
}

/// Why a reconciliation asked the loop to stop
#[derive(Debug)]
pub enum HaltReason {
    /// Neither family could be resolved; refusing to act on nothing
    NoAddresses,
    /// The provider rejected the write in a way retrying will not fix
    Provider(Error),
}

/// Why [`DdnsEngine::run`] returned without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown signal received while idle
    Shutdown,
    /// Neither IPv4 nor IPv6 address could be found
    NoAddresses,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Shutdown => write!(f, "Shutdown signal"),
            StopReason::NoAddresses => write!(f, "No address family could be resolved"),
        }
    }
}

/// Core reconcile engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`], which reads existing records and loops
/// 3. The loop ends on a shutdown signal, on [`HaltReason`], or on a fatal
///    startup read
///
/// ## Threading
///
/// One reconciliation at a time, one network call outstanding at a time.
/// `published` is owned by the engine; nothing else reads or writes it.
pub struct DdnsEngine {
    /// Echo service client
    resolver: Box<dyn AddressResolver>,

    /// Reader/writer for the managed record
    zone: Zone,

    /// Sleep between iterations
    jitter: Jitter,

    /// Last values known to be in DNS
    published: AddressPair,

    /// Maximum retry attempts for retryable provider errors
    max_retries: usize,

    /// Delay before the first retry
    retry_delay: Duration,

    /// Cap for the doubled retry delay
    max_retry_delay: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        provider: Box<dyn ZoneProvider>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            resolver,
            zone: Zone::new(provider, &config.domain),
            jitter: Jitter::new(config.domain.poll_interval(), config.domain.jitter()),
            published: AddressPair::default(),
            max_retries: config.engine.max_retries,
            retry_delay: Duration::from_secs(config.engine.retry_delay_secs),
            max_retry_delay: Duration::from_secs(config.engine.max_retry_delay_secs),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Last values known to be in DNS
    pub fn published(&self) -> &AddressPair {
        &self.published
    }

    /// Run the engine until SIGINT/SIGTERM or a halt
    ///
    /// # Returns
    ///
    /// - `Ok(StopReason)`: the loop ended without a provider failure
    /// - `Err(Error)`: startup read failed or a write was rejected
    pub async fn run(self) -> Result<StopReason> {
        self.run_internal(None).await
    }

    /// Test-only helper to run the engine with a controlled shutdown signal
    ///
    /// Production code should use `run()`, which listens for OS signals.
    pub async fn run_with_shutdown(
        self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<StopReason> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<StopReason> {
        info!(
            "Starting up: managing {} in zone {} via {} (addresses from {}, every {:?} +/- {:?})",
            self.zone.domain(),
            self.zone.zone_id(),
            self.zone.provider_name(),
            self.resolver.resolver_name(),
            self.jitter.base(),
            self.jitter.spread()
        );
        self.emit_event(EngineEvent::Started {
            domain: self.zone.domain().to_string(),
        });

        if let Err(e) = self.load_published().await {
            error!("Could not fetch existing records: {}", e);
            self.emit_event(EngineEvent::Stopped {
                reason: e.to_string(),
            });
            return Err(e);
        }

        let mut shutdown = shutdown_signal(shutdown_rx);

        let reason = loop {
            match self.reconcile().await {
                Outcome::Continue => {}
                Outcome::Halt(HaltReason::NoAddresses) => break StopReason::NoAddresses,
                Outcome::Halt(HaltReason::Provider(e)) => {
                    info!("Shutting down");
                    self.emit_event(EngineEvent::Stopped {
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
            }

            let delay = self.jitter.sample(&mut rand::rng());
            info!("Sleeping {:?} until next check...", delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break StopReason::Shutdown;
                }
            }
        };

        info!("Shutting down");
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });

        Ok(reason)
    }

    /// Read the published records and make them the diff baseline
    ///
    /// Retryable provider errors are retried per the engine policy; anything
    /// left after that is returned and is fatal for `run()`.
    pub async fn load_published(&mut self) -> Result<()> {
        let (result, _) = self
            .with_retry("Reading existing records", || self.zone.read_existing())
            .await;
        let existing = result?;

        info!(
            "Existing IPv4 record is: {}",
            existing.ipv4.as_deref().unwrap_or("<none>")
        );
        info!(
            "Existing IPv6 record is: {}",
            existing.ipv6.as_deref().unwrap_or("<none>")
        );

        self.published = existing;
        self.emit_event(EngineEvent::ExistingRecords {
            published: self.published.clone(),
        });

        Ok(())
    }

    /// Run one reconciliation: resolve, diff, and write if needed
    pub async fn reconcile(&mut self) -> Outcome {
        let (observed, failed_lookups) = self.observe().await;
        self.emit_event(EngineEvent::AddressesObserved {
            observed: observed.clone(),
        });

        if observed.is_empty() {
            if failed_lookups > 0 {
                warn!("{} address lookup(s) failed outright", failed_lookups);
            }
            error!("Neither IPv4 nor IPv6 addresses found. Cowardly giving up with no updates.");
            return Outcome::Halt(HaltReason::NoAddresses);
        }

        for family in IpFamily::ALL {
            if let (Some(published), None) = (self.published.get(family), observed.get(family)) {
                warn!(
                    "{} address is no longer available; leaving {} record at {}",
                    family,
                    RecordType::for_family(family),
                    published
                );
            }
        }

        let changes = ChangeSet::between(&self.published, &observed);
        if changes.is_empty() {
            info!("No changes.");
            self.emit_event(EngineEvent::UpdateSkipped {
                published: self.published.clone(),
            });
            return Outcome::Continue;
        }

        for (family, value) in changes.iter() {
            info!(
                "{} addresses do not match ({} -> {}). Updating...",
                family,
                self.published.get(family).unwrap_or("<none>"),
                value
            );
        }

        let (result, retries) = self
            .with_retry("Upsert", || self.zone.upsert(&changes))
            .await;

        match result {
            Ok(receipt) => {
                self.published.apply(&changes);
                info!("OK (change {} is {})", receipt.id, receipt.status);
                self.emit_event(EngineEvent::UpdateSucceeded {
                    written: changes,
                    change_id: receipt.id,
                });
                Outcome::Continue
            }
            Err(e) => {
                self.emit_event(EngineEvent::UpdateFailed {
                    error: e.to_string(),
                    retry_count: retries,
                });

                if e.is_retryable() {
                    error!("Update failed, will retry on next check: {}", e);
                    Outcome::Continue
                } else {
                    error!(
                        "Update rejected by {}, giving up: {}",
                        self.zone.provider_name(),
                        e
                    );
                    Outcome::Halt(HaltReason::Provider(e))
                }
            }
        }
    }

    /// Resolve both families, one call at a time
    ///
    /// Returns the observed pair and how many lookups failed outright.
    async fn observe(&self) -> (AddressPair, usize) {
        let mut observed = AddressPair::default();
        let mut failed = 0;

        for family in IpFamily::ALL {
            match self.resolver.resolve(family).await {
                Ok(address) => observed.set(family, address),
                Err(e) => {
                    warn!("Could not resolve {} address: {}", family, e);
                    failed += 1;
                }
            }

            info!(
                "Current {} address is: {}",
                family,
                observed.get(family).unwrap_or("<none>")
            );
        }

        (observed, failed)
    }

    /// Run a provider call, retrying retryable errors with doubling backoff
    ///
    /// Returns the final result and the number of retries performed.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> (Result<T>, usize)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => return (Ok(value), attempt),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} attempt {} failed: {}; retrying in {:?}",
                        operation,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return (Err(e), attempt),
            }
        }
    }

    /// Delay before retry number `attempt + 1`
    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Build the future that completes when the loop should stop sleeping
fn shutdown_signal(
    shutdown_rx: Option<oneshot::Receiver<()>>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    match shutdown_rx {
        // A dropped sender means "never shut down"
        Some(rx) => Box::pin(async move {
            if rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        }),
        None => Box::pin(wait_for_termination()),
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to setup SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => debug!("SIGTERM received"),
        _ = tokio::signal::ctrl_c() => debug!("SIGINT received"),
    }
}

/// Wait for CTRL-C
#[cfg(not(unix))]
async fn wait_for_termination() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to wait for CTRL-C: {}", e);
        std::future::pending::<()>().await;
    }
}
