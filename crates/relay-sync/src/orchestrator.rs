//! The sync orchestrator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relay_core::{
    AdapterError, AdapterResult, IdempotencyKey, IdempotencyStore, LockState, RecordSystem,
    ResolutionCause, Secret, SyncError, SyncOutcome, SyncResult,
};
use relay_webhook::{CheckoutCompleted, ClassifiedEvent, DateChange, TokenError};
use tracing::{debug, error, info, instrument, warn};

use crate::{AMOUNT_PAID_KEY, Credentials, DEFAULT_CALL_TIMEOUT, FieldMapping, OUTGOING_DATE_KEY};

/// Collaborators the orchestrator is built from.
pub struct SyncDeps {
    pub board: Arc<dyn RecordSystem>,
    pub ledger: Arc<dyn RecordSystem>,
    pub payments: Arc<dyn RecordSystem>,
    pub store: Arc<dyn IdempotencyStore>,
    pub credentials: Credentials,
    pub fields: FieldMapping,
}

/// The single field write one event authorizes.
struct WritePlan<'a> {
    /// System that maps the inbound id to a ledger job.
    resolver: &'a dyn RecordSystem,
    resolver_credential: &'a Secret,
    reference: &'a str,
    field: &'a str,
    value: &'a str,
}

/// How the authoritative phase ended without error.
#[derive(Debug)]
enum Authoritative {
    Applied { job_id: String },
    Locked { job_id: String },
}

/// A best-effort audit note.
struct Note<'a> {
    system: &'a dyn RecordSystem,
    credential: &'a Secret,
    target: String,
    text: String,
}

/// Runs one procedure per classified event.
pub struct SyncOrchestrator {
    deps: SyncDeps,
    call_timeout: Duration,
}

impl SyncOrchestrator {
    #[must_use]
    pub const fn new(deps: SyncDeps) -> Self {
        Self {
            deps,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Deadline for each adapter call, on top of the HTTP client's own timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run the procedure for `event`.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_date_change`] and [`Self::apply_checkout`].
    pub async fn dispatch(
        &self,
        event: &ClassifiedEvent,
        token_secret: &Secret,
    ) -> SyncResult<SyncOutcome> {
        match event {
            ClassifiedEvent::DateChanged(change) => self.apply_date_change(change).await,
            ClassifiedEvent::CheckoutCompleted(checkout) => {
                self.apply_checkout(checkout, token_secret).await
            }
        }
    }

    /// Board date column changed: write the outgoing date on the linked job.
    ///
    /// # Errors
    ///
    /// Idempotency store, reference resolution, lock check or field write failures.
    #[instrument(
        name = "sync.date_change",
        skip_all,
        fields(
            source = %change.event.source_system(),
            event_type = %change.event.event_type(),
            item_id = %change.item_id(),
        )
    )]
    pub async fn apply_date_change(&self, change: &DateChange) -> SyncResult<SyncOutcome> {
        let date = change.date_string();
        let key = change.event.idempotency_key();
        if self.already_applied(&key).await? {
            info!(value = %date, "Duplicate delivery; already applied");
            return Ok(SyncOutcome::duplicate(OUTGOING_DATE_KEY, date));
        }

        let credentials = &self.deps.credentials;
        let plan = WritePlan {
            resolver: self.deps.board.as_ref(),
            resolver_credential: &credentials.board_api_token,
            reference: change.item_id(),
            field: &self.deps.fields.outgoing_date,
            value: &date,
        };

        let job_id = match self.authoritative_write(&plan).await? {
            Authoritative::Locked { job_id } => return Ok(SyncOutcome::locked(job_id)),
            Authoritative::Applied { job_id } => job_id,
        };
        self.mark_applied(&key).await;

        let audit_failures = self
            .advisory_notes(&[Note {
                system: self.deps.ledger.as_ref(),
                credential: &credentials.ledger_api_token,
                target: job_id.clone(),
                text: format!(
                    "Outgoing date set to {date} from board item {}.",
                    change.item_id()
                ),
            }])
            .await;

        info!(job_id = %job_id, value = %date, audit_failures, "Outgoing date synced");
        Ok(SyncOutcome::applied(job_id, OUTGOING_DATE_KEY, date))
    }

    /// Checkout completed: verify the reference token, then record the payment.
    ///
    /// # Errors
    ///
    /// Token mismatch, idempotency store, reference resolution, lock check or
    /// field write failures.
    #[instrument(
        name = "sync.checkout",
        skip_all,
        fields(
            source = %checkout.event.source_system(),
            event_type = %checkout.event.event_type(),
            item_id = %checkout.session_id,
        )
    )]
    pub async fn apply_checkout(
        &self,
        checkout: &CheckoutCompleted,
        token_secret: &Secret,
    ) -> SyncResult<SyncOutcome> {
        check_reference_token(checkout, token_secret)?;
        debug!(job_id = %checkout.job_id, "Reference token valid");

        let key = checkout.event.idempotency_key();
        if self.already_applied(&key).await? {
            info!(value = %checkout.amount, "Duplicate delivery; already applied");
            return Ok(SyncOutcome::duplicate(AMOUNT_PAID_KEY, &checkout.amount));
        }

        let credentials = &self.deps.credentials;
        let plan = WritePlan {
            resolver: self.deps.ledger.as_ref(),
            resolver_credential: &credentials.ledger_api_token,
            reference: &checkout.job_id,
            field: &self.deps.fields.amount_paid,
            value: &checkout.amount,
        };

        let job_id = match self.authoritative_write(&plan).await? {
            Authoritative::Locked { job_id } => return Ok(SyncOutcome::locked(job_id)),
            Authoritative::Applied { job_id } => job_id,
        };
        self.mark_applied(&key).await;

        let mut notes = vec![Note {
            system: self.deps.ledger.as_ref(),
            credential: &credentials.ledger_api_token,
            target: job_id.clone(),
            text: format!(
                "Payment of {} received via checkout {}.",
                checkout.amount, checkout.session_id
            ),
        }];
        if let Some(payment_intent) = &checkout.payment_intent {
            notes.push(Note {
                system: self.deps.payments.as_ref(),
                credential: &credentials.payments_api_key,
                target: payment_intent.clone(),
                text: format!("Recorded against job {job_id}."),
            });
        }
        let audit_failures = self.advisory_notes(&notes).await;

        info!(job_id = %job_id, value = %checkout.amount, audit_failures, "Payment synced");
        Ok(SyncOutcome::applied(job_id, AMOUNT_PAID_KEY, &checkout.amount))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phases
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve, check the lock, write. Every failure here ends the run.
    async fn authoritative_write(&self, plan: &WritePlan<'_>) -> SyncResult<Authoritative> {
        let ledger = self.deps.ledger.as_ref();
        let credential = &self.deps.credentials.ledger_api_token;

        let resolver = plan.resolver.system_name();
        let job_id = match self
            .bounded(
                resolver,
                plan.resolver
                    .resolve_reference(plan.reference, plan.resolver_credential),
            )
            .await
        {
            Ok(Some(job_id)) => job_id,
            Ok(None) => {
                warn!(reference = plan.reference, system = resolver, "Reference not found");
                return Err(SyncError::ReferenceResolution {
                    reference: plan.reference.to_string(),
                    cause: ResolutionCause::NotFound { system: resolver },
                });
            }
            Err(err) => {
                log_authoritative_failure("resolve_reference", &err);
                return Err(SyncError::ReferenceResolution {
                    reference: plan.reference.to_string(),
                    cause: ResolutionCause::Lookup(err),
                });
            }
        };
        debug!(reference = plan.reference, job_id = %job_id, "Reference resolved");

        match self
            .bounded(ledger.system_name(), ledger.read_lock_state(&job_id, credential))
            .await
        {
            Ok(LockState::Unlocked) => debug!(job_id = %job_id, "Target unlocked"),
            Ok(LockState::Locked) => {
                info!(job_id = %job_id, "Target record is locked; no write attempted");
                return Ok(Authoritative::Locked { job_id });
            }
            Ok(LockState::NotFound) => {
                warn!(job_id = %job_id, "Resolved record vanished before lock check");
                return Err(SyncError::ReferenceResolution {
                    reference: job_id,
                    cause: ResolutionCause::NotFound {
                        system: ledger.system_name(),
                    },
                });
            }
            Err(err) => {
                log_authoritative_failure("read_lock_state", &err);
                return Err(SyncError::LockCheck {
                    reference: job_id,
                    error: err,
                });
            }
        }

        if let Err(err) = self
            .bounded(
                ledger.system_name(),
                ledger.write_field(&job_id, plan.field, plan.value, credential),
            )
            .await
        {
            log_authoritative_failure("write_field", &err);
            return Err(SyncError::ExternalWrite {
                reference: job_id,
                error: err,
            });
        }
        debug!(job_id = %job_id, field = plan.field, "Field written");

        Ok(Authoritative::Applied { job_id })
    }

    /// Write audit notes and return how many failed. Failures are logged and
    /// never change the outcome.
    async fn advisory_notes(&self, notes: &[Note<'_>]) -> usize {
        let mut failed = 0;
        for note in notes {
            let system = note.system.system_name();
            match self
                .bounded(
                    system,
                    note.system
                        .write_note(&note.target, &note.text, note.credential),
                )
                .await
            {
                Ok(()) => debug!(system, target = %note.target, "Audit note written"),
                Err(err) if err.is_transport() => {
                    failed += 1;
                    warn!(
                        system,
                        target = %note.target,
                        error = %err,
                        transport = true,
                        "Audit note not delivered"
                    );
                }
                Err(err) => {
                    failed += 1;
                    warn!(
                        system,
                        target = %note.target,
                        error = %err,
                        transport = false,
                        "Audit note rejected by remote system"
                    );
                }
            }
        }
        failed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn already_applied(&self, key: &IdempotencyKey) -> SyncResult<bool> {
        self.deps.store.seen(key).await.map_err(|err| {
            error!(error = %err, "Idempotency store unavailable; refusing to proceed");
            SyncError::from(err)
        })
    }

    async fn mark_applied(&self, key: &IdempotencyKey) {
        if let Err(err) = self.deps.store.record(key).await {
            // The write already landed; a redelivery may repeat it
            warn!(error = %err, "Failed to record idempotency marker");
        }
    }

    async fn bounded<T>(
        &self,
        system: &'static str,
        call: impl Future<Output = AdapterResult<T>>,
    ) -> AdapterResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or_else(|_| Err(AdapterError::timeout(system, self.call_timeout)))
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("board", &self.deps.board.system_name())
            .field("ledger", &self.deps.ledger.system_name())
            .field("payments", &self.deps.payments.system_name())
            .field("fields", &self.deps.fields)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

fn check_reference_token(checkout: &CheckoutCompleted, secret: &Secret) -> SyncResult<()> {
    match relay_webhook::validate(&checkout.job_id, &checkout.amount, &checkout.token, secret) {
        Ok(true) => Ok(()),
        Ok(false) => {
            warn!(job_id = %checkout.job_id, "Reference token mismatch");
            Err(SyncError::Authentication("reference token mismatch".into()))
        }
        Err(TokenError::MalformedToken) => Err(SyncError::Authentication(
            "reference token is not hexadecimal".into(),
        )),
        Err(TokenError::EmptySecret) => Err(SyncError::NotConfigured("token secret".into())),
        Err(err @ TokenError::InvalidBaseUrl(_)) => Err(SyncError::Internal(err.to_string())),
    }
}

fn log_authoritative_failure(step: &'static str, err: &AdapterError) {
    if err.is_transport() {
        error!(step, system = err.system(), error = %err, transport = true, "Transport failure");
    } else {
        error!(step, system = err.system(), error = %err, transport = false, "Remote system returned an error");
    }
}
