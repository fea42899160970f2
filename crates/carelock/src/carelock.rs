//! Top-level wiring of the four subsystems.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use carelock_audit::AuditTrail;
use carelock_compliance::{ComplianceEngine, PhiFieldLookup};
use carelock_config::{CarelockConfig, ConfigError};
use carelock_masking::FieldMasker;
use carelock_rbac::{AccessEvaluator, CareAssignments};
use carelock_session::{DEFAULT_SWEEP_INTERVAL, SessionManager, run_sweeper};
use carelock_types::{Clock, SystemClock};

/// Adapts the masking registry into the compliance engine's PHI lookup.
///
/// The engine never reaches into the masking store; it only sees this
/// narrow view.
struct MaskerPhiLookup(Arc<FieldMasker>);

impl PhiFieldLookup for MaskerPhiLookup {
    fn is_phi_field(&self, field: &str) -> bool {
        self.0.is_phi_field(field)
    }
}

/// The assembled access-control-and-compliance core.
pub struct Carelock {
    masker: Arc<FieldMasker>,
    sessions: Arc<SessionManager>,
    rbac: AccessEvaluator,
    compliance: ComplianceEngine,
    audit: AuditTrail,
}

impl Carelock {
    /// Assembles the core from configuration, failing fast on invalid
    /// settings.
    pub fn new(config: CarelockConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Assembles the core with an injected clock, for deterministic tests.
    pub fn with_clock(config: CarelockConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let masker = Arc::new(
            FieldMasker::new(config.masking.clone())
                .map_err(|error| ConfigError::Validation(error.to_string()))?,
        );

        let sessions = Arc::new(SessionManager::with_clock(
            config.session.clone(),
            Arc::clone(&clock),
        ));
        let rbac = AccessEvaluator::with_default_roles().clock(Arc::clone(&clock));
        let compliance =
            ComplianceEngine::with_builtin_rules(Arc::new(MaskerPhiLookup(Arc::clone(&masker))))
                .clock(Arc::clone(&clock));
        let audit = AuditTrail::with_clock(config.audit.clone(), Arc::clone(&masker), clock);

        info!("carelock core assembled");
        Ok(Self {
            masker,
            sessions,
            rbac,
            compliance,
            audit,
        })
    }

    /// Injects the care-assignment roster for care-scoped restrictions.
    pub fn care_assignments(mut self, assignments: Arc<dyn CareAssignments>) -> Self {
        self.rbac = self.rbac.care_assignments(assignments);
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn rbac(&self) -> &AccessEvaluator {
        &self.rbac
    }

    pub fn compliance(&self) -> &ComplianceEngine {
        &self.compliance
    }

    pub fn masker(&self) -> &FieldMasker {
        &self.masker
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Starts the periodic session sweep on the current tokio runtime.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        run_sweeper(Arc::clone(&self.sessions), DEFAULT_SWEEP_INTERVAL)
    }

    /// Terminates every active session.
    pub fn shutdown(&self) -> usize {
        self.sessions.shutdown()
    }
}
