//! Region selection procedure
//!
//! Drives the decision from a caller-specified primary region to exactly
//! one accepted region or a terminal failure.
//!
//! # State machine
//!
//! ```text
//!              ┌──────────────┐
//!              │ CheckPrimary │──── absent ──────────────────────► Fail(PrimaryRegionDataUnavailable)
//!              └──────┬───────┘
//!   sufficient +      │ sufficient,        insufficient
//!   recommended       │ not recommended         │
//!        │            ▼                         ▼
//!        │   ┌─────────────────┐       ┌────────────────┐
//!        │   │ ConfirmOverride │       │ SearchFallback │── empty pool ──► Fail(NoRegionMeetsCapacity)
//!        │   └───┬─────────┬───┘       └───────┬────────┘
//!        │  stay │         │ switch            │
//!        ▼       ▼         ▼                   ▼
//!    Accept(primary)   ┌──────────────────────────┐
//!                      │ PromptFallbackChoice     │◄──────────┐
//!                      └────────────┬─────────────┘           │ absent / insufficient /
//!                                   ▼                         │ declined
//!                      ┌──────────────────────────┐           │
//!                      │ CheckCandidate(region)   │───────────┘
//!                      └────────────┬─────────────┘
//!                                   ▼
//!                           Accept(region)
//! ```
//!
//! Any prompt that gets no input ends the run with `Fail(UserAborted)`.
//! The loop is driven by the caller and has no iteration bound.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;

use super::assessment::{AssessmentEngine, RegionAssessment};
use crate::models::{FailureReason, ModelRequest, SelectionOutcome};

// ============================================================================
// Events
// ============================================================================

/// How an event should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Success,
    Error,
}

/// Why a proposed candidate was sent back to the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingData,
    Insufficient,
    Declined,
}

/// Diagnostic emitted on every transition
#[derive(Debug, Clone, Copy)]
pub enum SelectionEvent<'a> {
    /// The primary region has been assessed
    PrimaryAssessed(&'a RegionAssessment),
    /// Primary is sufficient but below the threshold; `alternatives` other
    /// regions are recommended
    PrimaryBelowThreshold {
        primary: &'a RegionAssessment,
        alternatives: usize,
    },
    /// Primary is insufficient; probing the other candidates
    FallbackSearch {
        primary: &'a RegionAssessment,
        candidates: usize,
    },
    /// Sufficient fallback regions found
    FallbackPool { total: usize, recommended: usize },
    /// A proposed region has been re-assessed
    CandidateAssessed(&'a RegionAssessment),
    /// A proposed region was not accepted
    CandidateRejected {
        candidate: &'a RegionAssessment,
        reason: RejectReason,
    },
    Accepted(&'a str),
    Failed(&'a FailureReason),
}

impl SelectionEvent<'_> {
    pub fn level(&self) -> EventLevel {
        match self {
            SelectionEvent::PrimaryAssessed(_)
            | SelectionEvent::FallbackPool { .. }
            | SelectionEvent::CandidateAssessed(_) => EventLevel::Info,
            SelectionEvent::PrimaryBelowThreshold { .. }
            | SelectionEvent::FallbackSearch { .. }
            | SelectionEvent::CandidateRejected { .. } => EventLevel::Warning,
            SelectionEvent::Accepted(_) => EventLevel::Success,
            SelectionEvent::Failed(_) => EventLevel::Error,
        }
    }
}

fn describe_requests(f: &mut fmt::Formatter<'_>, assessment: &RegionAssessment) -> fmt::Result {
    for item in &assessment.requests {
        write!(
            f,
            "\n  - {} needs {}: {}",
            item.request.label(),
            item.request.capacity,
            item.observation.describe()
        )?;
    }
    Ok(())
}

impl fmt::Display for SelectionEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionEvent::PrimaryAssessed(a) => {
                write!(f, "Region '{}': {}", a.region, a.status_label())?;
                describe_requests(f, a)
            }
            SelectionEvent::PrimaryBelowThreshold {
                primary,
                alternatives,
            } => write!(
                f,
                "Region '{}' has enough quota but less than the recommended headroom; \
                 {} other region(s) are recommended",
                primary.region, alternatives
            ),
            SelectionEvent::FallbackSearch {
                primary,
                candidates,
            } => write!(
                f,
                "Region '{}' cannot satisfy all requested models; checking {} other region(s)",
                primary.region, candidates
            ),
            SelectionEvent::FallbackPool { total, recommended } => write!(
                f,
                "Found {} region(s) with sufficient quota ({} recommended)",
                total, recommended
            ),
            SelectionEvent::CandidateAssessed(a) => {
                write!(f, "Region '{}': {}", a.region, a.status_label())?;
                describe_requests(f, a)
            }
            SelectionEvent::CandidateRejected { candidate, reason } => match reason {
                RejectReason::MissingData => write!(
                    f,
                    "No quota data for region '{}'; choose another region",
                    candidate.region
                ),
                RejectReason::Insufficient => write!(
                    f,
                    "Region '{}' does not have enough quota; choose another region",
                    candidate.region
                ),
                RejectReason::Declined => {
                    write!(f, "Region '{}' not confirmed; choose another region", candidate.region)
                }
            },
            SelectionEvent::Accepted(region) => write!(f, "Selected region: {}", region),
            SelectionEvent::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

// ============================================================================
// Interaction
// ============================================================================

/// The caller's side of the procedure
///
/// Every prompt returns `None` when the caller gives no input; the run then
/// ends with `Fail(UserAborted)`.
pub trait Interaction {
    /// Present a transition diagnostic
    fn notify(&mut self, event: &SelectionEvent<'_>);

    /// The primary is sufficient but not recommended. `Some(true)` switches
    /// to choosing among the pool, `Some(false)` keeps the primary.
    fn confirm_switch(
        &mut self,
        primary: &RegionAssessment,
        alternatives: &[RegionAssessment],
    ) -> Option<bool>;

    /// Ask for one region name. `pool` is ranked, recommended first.
    fn choose_region(&mut self, pool: &[RegionAssessment]) -> Option<String>;

    /// The candidate is sufficient but not recommended; confirm using it.
    fn confirm_candidate(&mut self, candidate: &RegionAssessment) -> Option<bool>;
}

/// Non-interactive policy
///
/// Keeps the primary when it is merely below the threshold, proposes pool
/// regions in rank order (each at most once) and accepts low-headroom
/// candidates. Runs out of input once every pool region has been tried.
#[derive(Debug, Default)]
pub struct AutoApprove {
    tried: HashSet<String>,
}

impl AutoApprove {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Interaction for AutoApprove {
    fn notify(&mut self, event: &SelectionEvent<'_>) {
        log::info!("[select:auto] {}", event);
    }

    fn confirm_switch(&mut self, _primary: &RegionAssessment, _alternatives: &[RegionAssessment]) -> Option<bool> {
        Some(false)
    }

    fn choose_region(&mut self, pool: &[RegionAssessment]) -> Option<String> {
        let next = pool.iter().find(|r| !self.tried.contains(&r.region))?;
        self.tried.insert(next.region.clone());
        Some(next.region.clone())
    }

    fn confirm_candidate(&mut self, _candidate: &RegionAssessment) -> Option<bool> {
        Some(true)
    }
}

// ============================================================================
// Ranking
// ============================================================================

/// Sufficient regions, recommended first, then by smallest headroom
/// (largest first), then by name
pub fn rank_pool(assessments: impl IntoIterator<Item = RegionAssessment>) -> Vec<RegionAssessment> {
    let mut pool: Vec<RegionAssessment> = assessments.into_iter().filter(|a| a.sufficient).collect();
    pool.sort_by(|a, b| {
        (!a.recommended, Reverse(a.min_available()), &a.region).cmp(&(
            !b.recommended,
            Reverse(b.min_available()),
            &b.region,
        ))
    });
    pool
}

// ============================================================================
// Procedure
// ============================================================================

enum State {
    CheckPrimary,
    ConfirmOverride {
        primary: RegionAssessment,
        pool: Vec<RegionAssessment>,
    },
    SearchFallback {
        primary: RegionAssessment,
    },
    PromptFallbackChoice {
        pool: Vec<RegionAssessment>,
    },
    CheckCandidate {
        region: String,
        pool: Vec<RegionAssessment>,
    },
    Done(SelectionOutcome),
}

/// One selection run over a fixed request set and candidate list
pub struct SelectionProcedure<'a> {
    engine: &'a AssessmentEngine,
    requests: &'a [ModelRequest],
    candidates: &'a [String],
}

impl<'a> SelectionProcedure<'a> {
    pub fn new(engine: &'a AssessmentEngine, requests: &'a [ModelRequest], candidates: &'a [String]) -> Self {
        Self {
            engine,
            requests,
            candidates,
        }
    }

    /// Candidates other than the primary
    fn fallback_regions(&self, primary: &str) -> Vec<String> {
        self.candidates
            .iter()
            .filter(|c| c.as_str() != primary)
            .cloned()
            .collect()
    }

    /// Run the procedure to completion
    pub async fn run<I>(&self, primary: &str, interaction: &mut I) -> SelectionOutcome
    where
        I: Interaction + ?Sized,
    {
        let primary = primary.trim();
        let outcome = if self.requests.is_empty() {
            SelectionOutcome::Failed(FailureReason::InvalidRequestSpecification(
                "no model requests given".to_string(),
            ))
        } else if primary.is_empty() {
            SelectionOutcome::Failed(FailureReason::InvalidRequestSpecification(
                "primary region must not be empty".to_string(),
            ))
        } else {
            self.drive(primary, interaction).await
        };

        match &outcome {
            SelectionOutcome::Accepted(region) => {
                log::info!("[select] Accepted {}", region);
                interaction.notify(&SelectionEvent::Accepted(region));
            }
            SelectionOutcome::Failed(reason) => {
                log::warn!("[select] Failed: {}", reason);
                interaction.notify(&SelectionEvent::Failed(reason));
            }
        }
        outcome
    }

    async fn drive<I>(&self, primary: &str, interaction: &mut I) -> SelectionOutcome
    where
        I: Interaction + ?Sized,
    {
        let mut state = State::CheckPrimary;

        loop {
            state = match state {
                State::CheckPrimary => {
                    log::info!("[select] Checking primary region {}", primary);
                    let assessed = self.engine.assess_region(self.requests, primary).await;
                    interaction.notify(&SelectionEvent::PrimaryAssessed(&assessed));

                    if assessed.has_missing_data {
                        let detail = assessed
                            .missing()
                            .map(|r| format!("{}: {}", r.request.label(), r.observation.describe()))
                            .collect::<Vec<_>>()
                            .join("; ");
                        State::Done(SelectionOutcome::Failed(
                            FailureReason::PrimaryRegionDataUnavailable {
                                region: primary.to_string(),
                                detail,
                            },
                        ))
                    } else if assessed.sufficient && assessed.recommended {
                        State::Done(SelectionOutcome::Accepted(assessed.region))
                    } else if assessed.sufficient {
                        let table = self
                            .engine
                            .assess(self.requests, &self.fallback_regions(primary))
                            .await;
                        let pool = rank_pool(table.into_values());
                        let alternatives = pool.iter().filter(|r| r.recommended).count();
                        interaction.notify(&SelectionEvent::PrimaryBelowThreshold {
                            primary: &assessed,
                            alternatives,
                        });

                        if alternatives == 0 {
                            State::Done(SelectionOutcome::Accepted(assessed.region))
                        } else {
                            State::ConfirmOverride {
                                primary: assessed,
                                pool,
                            }
                        }
                    } else {
                        State::SearchFallback { primary: assessed }
                    }
                }

                State::ConfirmOverride { primary, pool } => {
                    let alternatives: Vec<RegionAssessment> =
                        pool.iter().filter(|r| r.recommended).cloned().collect();
                    match interaction.confirm_switch(&primary, &alternatives) {
                        None => State::Done(SelectionOutcome::Failed(FailureReason::UserAborted)),
                        Some(false) => State::Done(SelectionOutcome::Accepted(primary.region)),
                        Some(true) => State::PromptFallbackChoice { pool },
                    }
                }

                State::SearchFallback { primary } => {
                    let fallbacks = self.fallback_regions(&primary.region);
                    interaction.notify(&SelectionEvent::FallbackSearch {
                        primary: &primary,
                        candidates: fallbacks.len(),
                    });

                    let table = self.engine.assess(self.requests, &fallbacks).await;
                    let pool = rank_pool(table.into_values());
                    if pool.is_empty() {
                        State::Done(SelectionOutcome::Failed(FailureReason::NoRegionMeetsCapacity))
                    } else {
                        interaction.notify(&SelectionEvent::FallbackPool {
                            total: pool.len(),
                            recommended: pool.iter().filter(|r| r.recommended).count(),
                        });
                        State::PromptFallbackChoice { pool }
                    }
                }

                State::PromptFallbackChoice { pool } => match interaction.choose_region(&pool) {
                    Some(region) if !region.trim().is_empty() => State::CheckCandidate {
                        region: region.trim().to_string(),
                        pool,
                    },
                    _ => State::Done(SelectionOutcome::Failed(FailureReason::UserAborted)),
                },

                State::CheckCandidate { region, pool } => {
                    log::info!("[select] Re-checking candidate {}", region);
                    let candidate = self.engine.assess_region(self.requests, &region).await;
                    interaction.notify(&SelectionEvent::CandidateAssessed(&candidate));

                    let rejected = if candidate.has_missing_data {
                        Some(RejectReason::MissingData)
                    } else if !candidate.sufficient {
                        Some(RejectReason::Insufficient)
                    } else if candidate.recommended {
                        None
                    } else {
                        match interaction.confirm_candidate(&candidate) {
                            None => {
                                return SelectionOutcome::Failed(FailureReason::UserAborted);
                            }
                            Some(true) => None,
                            Some(false) => Some(RejectReason::Declined),
                        }
                    };

                    match rejected {
                        None => State::Done(SelectionOutcome::Accepted(candidate.region)),
                        Some(reason) => {
                            interaction.notify(&SelectionEvent::CandidateRejected {
                                candidate: &candidate,
                                reason,
                            });
                            State::PromptFallbackChoice { pool }
                        }
                    }
                }

                State::Done(outcome) => return outcome,
            };
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
