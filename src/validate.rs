//! Cross-Validator: accelerated methods must return exactly the distances of
//! the reference method on the same query set.

use log::warn;

use crate::aggregate::AggregatedResult;
use crate::method::Method;

/// Canonical distances of the reference method, fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDistances {
    pub method: Method,
    pub distances: Vec<u64>,
}

/// First position at which a candidate departs from the reference. A `None`
/// side means that sequence ended before `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    pub index: usize,
    pub expected: Option<u64>,
    pub actual: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    IsReference,
    Match,
    Mismatch(Divergence),
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::IsReference => "reference",
            ValidationOutcome::Match => "match",
            ValidationOutcome::Mismatch(_) => "mismatch",
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, ValidationOutcome::Mismatch(_))
    }
}

/// Locate the first element-wise difference, counting a length difference as
/// one.
pub fn first_divergence(reference: &[u64], candidate: &[u64]) -> Option<Divergence> {
    let len = reference.len().max(candidate.len());
    (0..len).find_map(|i| {
        let expected = reference.get(i).copied();
        let actual = candidate.get(i).copied();
        (expected != actual).then_some(Divergence {
            index: i,
            expected,
            actual,
        })
    })
}

/// Compare `candidate` against `reference`; no reference means the candidate
/// is the reference itself.
pub fn validate(
    candidate: &AggregatedResult,
    reference: Option<&ReferenceDistances>,
) -> ValidationOutcome {
    match reference {
        None => ValidationOutcome::IsReference,
        Some(reference) => {
            match first_divergence(&reference.distances, &candidate.canonical_distances) {
                None => ValidationOutcome::Match,
                Some(d) => ValidationOutcome::Mismatch(d),
            }
        }
    }
}

/// Holds the session's reference distances and checks every other method
/// against them.
#[derive(Debug, Default)]
pub struct CrossValidator {
    reference: Option<ReferenceDistances>,
}

impl CrossValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference(&self) -> Option<&ReferenceDistances> {
        self.reference.as_ref()
    }

    /// Validate one method. The first method checked becomes the reference,
    /// and re-checking the reference method always reports it as such.
    pub fn check(&mut self, method: Method, candidate: &AggregatedResult) -> ValidationOutcome {
        match &self.reference {
            Some(reference) if reference.method == method => ValidationOutcome::IsReference,
            Some(reference) => {
                let outcome = validate(candidate, Some(reference));
                if let ValidationOutcome::Mismatch(d) = outcome {
                    warn!(
                        "{} returned different distances than {}: first divergence at query {} (expected {}, got {})",
                        method,
                        reference.method,
                        d.index,
                        fmt_distance(d.expected),
                        fmt_distance(d.actual),
                    );
                }
                outcome
            }
            None => {
                self.reference = Some(ReferenceDistances {
                    method,
                    distances: candidate.canonical_distances.clone(),
                });
                ValidationOutcome::IsReference
            }
        }
    }
}

fn fmt_distance(d: Option<u64>) -> String {
    match d {
        Some(d) => d.to_string(),
        None => "nothing".to_string(),
    }
}
