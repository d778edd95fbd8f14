use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, warn};

use destore_core::{ApplicationId, DomainError, DomainResult, Entity, StoreId, generate_reference};
use destore_finance::{
    DecisionPolicy, DecisionRequest, FinanceApplication, FinanceDecision, FinanceStatus,
    NewFinanceApplication,
};

use crate::config::FinanceConfig;
use crate::publisher::EventPublisher;
use crate::services::require;
use crate::store::{EntityStore, KeyedLocks};

const WAIT_TICK: Duration = Duration::from_millis(25);

/// External lender deciding on an application. Calls may block.
pub trait LendingPartner: Send + Sync {
    fn decide(&self, request: &DecisionRequest) -> DomainResult<FinanceDecision>;
}

/// In-process lender driven by [`DecisionPolicy`], emulating network latency.
#[derive(Debug)]
pub struct SimulatedLender {
    policy: DecisionPolicy,
    rng: Mutex<StdRng>,
}

impl SimulatedLender {
    /// A fixed `seed` makes decisions reproducible.
    pub fn new(policy: DecisionPolicy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            policy,
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(config: &FinanceConfig) -> Self {
        Self::new(config.policy(), config.rng_seed)
    }
}

impl LendingPartner for SimulatedLender {
    fn decide(&self, request: &DecisionRequest) -> DomainResult<FinanceDecision> {
        let (latency, decision) = {
            // The generator holds no invariant a panic could break.
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let latency = self.policy.sample_latency(&mut *rng);
            (latency, self.policy.decide(request, &mut *rng))
        };
        thread::sleep(latency);
        decision
    }
}

/// Caller-side cancellation of a pending lender call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Finance application workflow.
///
/// The SUBMITTED transition commits before the lender is called and is never
/// rolled back; a failed, timed-out or cancelled call moves the application
/// to ERROR instead.
pub struct FinanceService {
    applications: Arc<dyn EntityStore<FinanceApplication>>,
    lender: Arc<dyn LendingPartner>,
    locks: KeyedLocks<ApplicationId>,
    reference_lock: KeyedLocks<()>,
    publisher: EventPublisher,
    config: FinanceConfig,
}

impl FinanceService {
    pub fn new(
        applications: Arc<dyn EntityStore<FinanceApplication>>,
        lender: Arc<dyn LendingPartner>,
        publisher: EventPublisher,
        config: FinanceConfig,
    ) -> Self {
        Self {
            applications,
            lender,
            locks: KeyedLocks::new(),
            reference_lock: KeyedLocks::new(),
            publisher,
            config,
        }
    }

    pub fn create_application(&self, cmd: NewFinanceApplication) -> DomainResult<FinanceApplication> {
        self.reference_lock.with_lock(&(), || {
            let reference = loop {
                let candidate = generate_reference("FIN");
                let taken = self
                    .applications
                    .find(&|a: &FinanceApplication| a.reference() == candidate)?;
                if taken.is_none() {
                    break candidate;
                }
            };

            let application = FinanceApplication::create(&cmd, reference, Utc::now())?;
            self.applications.insert(application.clone())?;
            info!(
                application_id = %application.id(),
                reference = application.reference(),
                amount = %application.amount(),
                "finance application created"
            );
            Ok(application)
        })
    }

    pub fn submit_application(&self, id: ApplicationId) -> DomainResult<FinanceApplication> {
        self.submit_application_with_cancel(id, &CancelToken::new())
    }

    /// Submit and wait for the lender, giving up on `cancel` or after the
    /// configured decision timeout.
    pub fn submit_application_with_cancel(
        &self,
        id: ApplicationId,
        cancel: &CancelToken,
    ) -> DomainResult<FinanceApplication> {
        let submitted = self.locks.with_lock(&id, || {
            let current = require(self.applications.get(&id)?, "FinanceApplication", id)?;
            let next = current.submit(Utc::now())?;
            self.applications.save(next.clone())?;
            info!(application_id = %id, reference = next.reference(), "finance application submitted");
            Ok::<_, DomainError>(next)
        })?;

        let outcome = self.await_decision(submitted.decision_request(), cancel);

        self.locks.with_lock(&id, || {
            let current = require(self.applications.get(&id)?, "FinanceApplication", id)?;
            if current.status() != FinanceStatus::Submitted {
                warn!(
                    application_id = %id,
                    status = %current.status(),
                    "application changed while awaiting decision; lender result dropped"
                );
                return Ok(current);
            }

            let now = Utc::now();
            match outcome {
                Ok(decision) => {
                    let decided = current.record_decision(&decision, now)?;
                    self.applications.save(decided.clone())?;
                    info!(
                        application_id = %id,
                        status = %decided.status(),
                        external_reference = %decision.external_reference,
                        "finance decision recorded"
                    );
                    if let Some(event) = decided.decision_event() {
                        self.publisher.publish(Some(decided.store_id()), event, now);
                    }
                    Ok(decided)
                }
                Err(cause) => {
                    error!(application_id = %id, cause = %cause, "finance decision failed");
                    let failed = current.record_failure(&cause, now)?;
                    self.applications.save(failed.clone())?;
                    Ok(failed)
                }
            }
        })
    }

    pub fn cancel_application(&self, id: ApplicationId) -> DomainResult<FinanceApplication> {
        self.locks.with_lock(&id, || {
            let current = require(self.applications.get(&id)?, "FinanceApplication", id)?;
            let next = current.cancel(Utc::now())?;
            self.applications.save(next.clone())?;
            info!(application_id = %id, "finance application cancelled");
            Ok(next)
        })
    }

    pub fn get_application(&self, id: ApplicationId) -> DomainResult<FinanceApplication> {
        require(self.applications.get(&id)?, "FinanceApplication", id)
    }

    pub fn get_by_reference(&self, reference: &str) -> DomainResult<FinanceApplication> {
        let found = self
            .applications
            .find(&|a: &FinanceApplication| a.reference() == reference)?;
        require(found, "FinanceApplication", format!("reference={reference}"))
    }

    pub fn applications_for_store(&self, store_id: StoreId) -> DomainResult<Vec<FinanceApplication>> {
        let mut apps = self
            .applications
            .filter(&|a: &FinanceApplication| a.store_id() == store_id)?;
        apps.sort_by_key(|a| a.created_at());
        Ok(apps)
    }

    pub fn pending_applications(&self) -> DomainResult<Vec<FinanceApplication>> {
        let mut apps = self
            .applications
            .filter(&|a: &FinanceApplication| a.status() == FinanceStatus::Pending)?;
        apps.sort_by_key(|a| a.created_at());
        Ok(apps)
    }

    /// Run the lender call on its own thread and wait for it. The error string
    /// becomes the ERROR reason.
    fn await_decision(&self, request: DecisionRequest, cancel: &CancelToken) -> Result<FinanceDecision, String> {
        let (tx, rx) = mpsc::channel();
        let lender = Arc::clone(&self.lender);
        thread::Builder::new()
            .name("finance-lender".to_string())
            .spawn(move || {
                // The receiver is gone once the caller gave up.
                let _ = tx.send(lender.decide(&request));
            })
            .map_err(|e| format!("could not start lender call: {e}"))?;

        let timeout = self.config.decision_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            if cancel.is_cancelled() {
                return Err("decision request cancelled by caller".to_string());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(format!("decision timed out after {}ms", timeout.as_millis()));
            }
            match rx.recv_timeout(remaining.min(WAIT_TICK)) {
                Ok(Ok(decision)) => return Ok(decision),
                Ok(Err(err)) => return Err(err.to_string()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err("lending partner call ended without a decision".to_string());
                }
            }
        }
    }
}

impl core::fmt::Debug for FinanceService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FinanceService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
