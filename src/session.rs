//! A benchmark session: build structures, run every method's trials,
//! aggregate, cross-validate and collect the comparison table.
//!
//! Everything is sequential. The reference method is always tested first so
//! its distances are settled before any other method is validated. Problems
//! that only concern the quality of one method's answers (non-determinism,
//! disagreement with the reference, a corrupt measurement file) become
//! warnings; failures of the external programs, cancellation and the session
//! deadline abort the session, handing back whatever was collected so far.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use thiserror::Error;

use crate::aggregate::{aggregate, AggregatedResult};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::method::Method;
use crate::query_set::QuerySet;
use crate::results::{ComparisonRow, ResultTable};
use crate::schema::{MethodMetrics, MethodResult, SessionInfo};
use crate::structure::{StructureBuilder, StructureHandle};
use crate::trial::{TrialResult, TrialRunner};
use crate::validate::{CrossValidator, Divergence, ValidationOutcome};

// ---------------------------------------------------------------------------
// Session output
// ---------------------------------------------------------------------------

/// A non-fatal finding, reported inline with the results.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionWarning {
    NonDeterministic {
        method: Method,
        trials: usize,
        distinct_outputs: usize,
    },
    Mismatch {
        method: Method,
        reference: Method,
        divergence: Divergence,
    },
    TrialDiscarded {
        method: Method,
        run: usize,
        reason: String,
    },
    NoValidTrials {
        method: Method,
    },
}

impl SessionWarning {
    pub fn method(&self) -> Method {
        match self {
            SessionWarning::NonDeterministic { method, .. }
            | SessionWarning::Mismatch { method, .. }
            | SessionWarning::TrialDiscarded { method, .. }
            | SessionWarning::NoValidTrials { method } => *method,
        }
    }
}

impl fmt::Display for SessionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionWarning::NonDeterministic {
                method,
                trials,
                distinct_outputs,
            } => write!(
                f,
                "{} returned {} different distance sequences across {} runs on the same query set",
                method, distinct_outputs, trials
            ),
            SessionWarning::Mismatch {
                method,
                reference,
                divergence,
            } => write!(
                f,
                "{} returned different distances than {}, first at query {}",
                method, reference, divergence.index
            ),
            SessionWarning::TrialDiscarded {
                method,
                run,
                reason,
            } => write!(f, "{} run {} discarded: {}", method, run + 1, reason),
            SessionWarning::NoValidTrials { method } => {
                write!(f, "{} produced no valid runs, no row recorded", method)
            }
        }
    }
}

/// Everything known about one tested method.
#[derive(Debug, Clone)]
pub struct MethodOutcome {
    pub method: Method,
    pub label: String,
    pub structure: StructureHandle,
    pub aggregated: AggregatedResult,
    pub validation: ValidationOutcome,
    pub discarded_trials: usize,
}

impl MethodOutcome {
    pub fn to_method_result(&self) -> MethodResult {
        let first_divergence = match self.validation {
            ValidationOutcome::Mismatch(d) => Some(d.index),
            _ => None,
        };
        MethodResult {
            method: self.method,
            label: self.label.clone(),
            structure: self.structure.path().display().to_string(),
            metrics: MethodMetrics {
                memory_mib: self.aggregated.mean_memory_mib,
                time_per_query_us: self.aggregated.mean_time_per_query_us,
                trials: self.aggregated.trial_count,
                discarded_trials: self.discarded_trials,
                consistent: self.aggregated.consistent,
                validation: self.validation.as_str().to_string(),
                first_divergence,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub query_count: usize,
    pub table: ResultTable,
    pub outcomes: Vec<MethodOutcome>,
    pub warnings: Vec<SessionWarning>,
}

impl SessionReport {
    pub fn outcome(&self, method: Method) -> Option<&MethodOutcome> {
        self.outcomes.iter().find(|o| o.method == method)
    }

    pub fn method_results(&self) -> Vec<MethodResult> {
        self.outcomes.iter().map(MethodOutcome::to_method_result).collect()
    }

    pub fn has_mismatches(&self) -> bool {
        self.outcomes.iter().any(|o| o.validation.is_mismatch())
    }
}

/// The session stopped early. `partial` holds the rows collected until then.
#[derive(Debug, Error)]
#[error("benchmark session aborted: {error}")]
pub struct SessionAbort {
    #[source]
    pub error: HarnessError,
    pub partial: SessionReport,
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Requests a running session to stop before its next external invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct BenchmarkSession {
    config: HarnessConfig,
    cancel: CancelHandle,
}

impl BenchmarkSession {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelHandle::default(),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Session description for the JSON report.
    pub fn info(&self, query_count: usize) -> SessionInfo {
        SessionInfo {
            instance: self.config.instance.clone(),
            query_set: self.config.query_set.display().to_string(),
            query_count,
            runs: self.config.runs,
            reference: self.config.reference,
        }
    }

    pub fn run(&self) -> std::result::Result<SessionReport, SessionAbort> {
        let started = Instant::now();
        let mut report = SessionReport::default();
        match self.execute(&mut report, started) {
            Ok(()) => {
                info!(
                    "session finished in {:.2}s: {} rows, {} warnings",
                    started.elapsed().as_secs_f64(),
                    report.table.len(),
                    report.warnings.len()
                );
                Ok(report)
            }
            Err(error) => {
                warn!(
                    "session aborted after {} rows: {}",
                    report.table.len(),
                    error
                );
                Err(SessionAbort {
                    error,
                    partial: report,
                })
            }
        }
    }

    fn execute(&self, report: &mut SessionReport, started: Instant) -> Result<()> {
        let config = &self.config;

        let query_set = QuerySet::load(&config.query_set)?;
        if query_set.is_empty() {
            return Err(HarnessError::QuerySet {
                path: config.query_set.clone(),
                detail: "no queries".into(),
            });
        }
        report.query_count = query_set.len();
        info!(
            "{}: {} queries, {} runs per method",
            config.instance,
            query_set.len(),
            config.runs
        );

        let order = config.testing_order();
        let mut structures = Vec::with_capacity(order.len());
        for spec in &order {
            self.checkpoint(started)?;
            let builder = StructureBuilder::from_config(config)
                .with_timeout(self.invocation_timeout(started));
            let prepared = if config.build_structures {
                builder.build(spec)
            } else {
                builder.resolve(spec)
            };
            structures.push(prepared.map_err(|e| self.past_deadline_or(started, e))?);
        }
        info!("{} structures ready", structures.len());

        let mut validator = CrossValidator::new();
        for (spec, structure) in order.iter().zip(&structures) {
            info!("benchmarking {} ({} runs)", spec.label(), config.runs);

            let mut trials: Vec<TrialResult> = Vec::with_capacity(config.runs);
            let mut discarded = 0;
            for run in 0..config.runs {
                self.checkpoint(started)?;
                let runner =
                    TrialRunner::from_config(config).with_timeout(self.invocation_timeout(started));
                match runner.run_trial(spec.method, structure, &query_set) {
                    Ok(trial) => trials.push(trial),
                    Err(e) if e.is_measurement_error() => {
                        warn!("{} run {} discarded: {}", spec.method, run + 1, e);
                        discarded += 1;
                        report.warnings.push(SessionWarning::TrialDiscarded {
                            method: spec.method,
                            run,
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(self.past_deadline_or(started, e)),
                }
            }

            if trials.is_empty() {
                if spec.method == config.reference {
                    return Err(HarnessError::InvalidAggregate(format!(
                        "reference method {} produced no valid runs",
                        spec.method
                    )));
                }
                warn!("{} produced no valid runs, skipping", spec.method);
                report
                    .warnings
                    .push(SessionWarning::NoValidTrials { method: spec.method });
                continue;
            }

            let aggregated = aggregate(&trials, query_set.len())?;
            if !aggregated.consistent {
                report.warnings.push(SessionWarning::NonDeterministic {
                    method: spec.method,
                    trials: aggregated.trial_count,
                    distinct_outputs: aggregated.distinct_outputs,
                });
            }

            let validation = validator.check(spec.method, &aggregated);
            if let ValidationOutcome::Mismatch(divergence) = validation {
                report.warnings.push(SessionWarning::Mismatch {
                    method: spec.method,
                    reference: config.reference,
                    divergence,
                });
            }

            info!(
                "{}: {:.2} MiB, {:.3} us/query ({})",
                spec.label(),
                aggregated.mean_memory_mib,
                aggregated.mean_time_per_query_us,
                validation.as_str()
            );
            report.table.push(ComparisonRow::new(
                spec.label(),
                aggregated.mean_memory_mib,
                aggregated.mean_time_per_query_us,
            ));
            report.outcomes.push(MethodOutcome {
                method: spec.method,
                label: spec.label().to_string(),
                structure: structure.clone(),
                aggregated,
                validation,
                discarded_trials: discarded,
            });
        }
        Ok(())
    }

    /// Fails when the session was cancelled or ran past its deadline.
    fn checkpoint(&self, started: Instant) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(HarnessError::Cancelled);
        }
        if let Some(limit) = self.deadline_passed(started) {
            return Err(HarnessError::DeadlineExceeded(limit));
        }
        Ok(())
    }

    fn deadline_passed(&self, started: Instant) -> Option<Duration> {
        self.config
            .session_deadline()
            .filter(|limit| started.elapsed() >= *limit)
    }

    /// A failure after the deadline is reported as the deadline itself.
    fn past_deadline_or(&self, started: Instant, error: HarnessError) -> HarnessError {
        match self.deadline_passed(started) {
            Some(limit) => HarnessError::DeadlineExceeded(limit),
            None => error,
        }
    }

    /// Per-invocation timeout, capped so no single run outlives the session
    /// deadline.
    fn invocation_timeout(&self, started: Instant) -> Option<Duration> {
        let remaining = self
            .config
            .session_deadline()
            .map(|limit| limit.saturating_sub(started.elapsed()));
        match (self.config.timeout(), remaining) {
            (Some(t), Some(r)) => Some(t.min(r)),
            (t, r) => t.or(r),
        }
    }
}
