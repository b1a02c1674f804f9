//! Resumable phase state machine.
//!
//! Phases run strictly in order. After every phase the full [`RunState`] is
//! persisted through a [`SnapshotStore`]; when a phase fails, a best-effort
//! snapshot is written before the error is returned so the run can be
//! resumed from the last phase that completed.

use std::future::Future;

use fforest_state::SnapshotStore;
use fforest_types::{ExperimentParameters, Phase, RunLayout, RunState};

use crate::errors::PipelineError;

/// Entry points of every phase.
pub trait StageTable {
    /// Execute `phase`, reading and updating `state`.
    fn execute(
        &self,
        phase: Phase,
        state: &mut RunState,
    ) -> impl Future<Output = Result<(), PipelineError>>;
}

/// Phase to start from when the user asks to resume at `requested`.
///
/// A phase can only run once its predecessor has completed.
///
/// # Errors
///
/// Returns [`PipelineError::UnprocessablePhase`] when `requested` lies more
/// than one phase past `last_completed`.
pub fn compute_resume_point(
    requested: Phase,
    last_completed: Option<Phase>,
) -> Result<Phase, PipelineError> {
    let reachable = last_completed.map_or(0, |phase| phase.rank() + 1);
    if requested.rank() > reachable {
        return Err(PipelineError::UnprocessablePhase {
            requested,
            last_completed,
        });
    }
    Ok(requested)
}

/// Load or create the run state and pick the starting phase.
///
/// Without `resume_phase`, a fresh state starting at [`Phase::Parse`] is
/// returned. With it, the persisted snapshot is loaded; a missing snapshot
/// falls back to a fresh run with a warning.
///
/// # Errors
///
/// Returns [`PipelineError::UnprocessablePhase`] when the snapshot does not
/// reach the requested phase, or [`PipelineError::Snapshot`] when it cannot
/// be read.
pub fn prepare_run(
    store: &dyn SnapshotStore,
    resume_phase: Option<Phase>,
    last_phase: Phase,
) -> Result<(RunState, Phase), PipelineError> {
    let Some(requested) = resume_phase else {
        return Ok((RunState::new(last_phase), Phase::Parse));
    };

    let Some(mut state) = store.load()? else {
        tracing::warn!(
            snapshot = store.location(),
            requested = %requested,
            "No run-state snapshot found; starting from the parse phase"
        );
        return Ok((RunState::new(last_phase), Phase::Parse));
    };

    let start = compute_resume_point(requested, state.last_completed_phase)?;
    tracing::info!(
        snapshot = store.location(),
        resume_phase = %start,
        last_completed = ?state.last_completed_phase,
        "Resuming from snapshot"
    );
    state.last_phase = last_phase;
    Ok((state, start))
}

/// Run every phase from `starting_phase`, checkpointing after each.
///
/// When the phase just completed is (or is past) `state.last_phase`, the
/// run jumps to [`Phase::End`]. The end phase is checkpointed but never
/// recorded as the last completed phase. Returns the phases executed, in
/// order.
///
/// # Errors
///
/// Returns the first stage error, after the best-effort snapshot, or a
/// snapshot error when checkpointing fails.
pub async fn run_phases<S: StageTable + ?Sized>(
    starting_phase: Phase,
    state: &mut RunState,
    stages: &S,
    store: &dyn SnapshotStore,
) -> Result<Vec<Phase>, PipelineError> {
    let mut executed = Vec::new();
    let mut phase = starting_phase;

    loop {
        state.current_phase = phase;
        tracing::info!(phase = %phase, "Phase started");

        if let Err(err) = stages.execute(phase, state).await {
            tracing::error!(phase = %phase, error = %err, "Phase failed");
            if !err.aborts_without_snapshot() {
                if let Err(save_err) = store.save(state) {
                    tracing::error!(
                        snapshot = store.location(),
                        error = %save_err,
                        "Failed to write run-state snapshot after failure"
                    );
                } else {
                    tracing::warn!(
                        snapshot = store.location(),
                        "Run-state snapshot written after failure"
                    );
                }
            }
            return Err(err);
        }

        // End runs after every stop point; it does not stand for the work
        // of the phases that were skipped.
        if phase != Phase::End {
            state.last_completed_phase = Some(phase);
        }
        store.save(state)?;
        executed.push(phase);
        tracing::info!(phase = %phase, "Phase completed");

        if phase == Phase::End {
            return Ok(executed);
        }
        phase = if phase >= state.last_phase {
            Phase::End
        } else {
            phase.next().unwrap_or(Phase::End)
        };
    }
}

pub(crate) fn parameters(state: &RunState) -> Result<&ExperimentParameters, PipelineError> {
    state.parameters.as_ref().ok_or_else(|| {
        PipelineError::infrastructure(
            "run state has no experiment parameters; resume from the parse phase",
        )
    })
}

pub(crate) fn parameters_mut(
    state: &mut RunState,
) -> Result<&mut ExperimentParameters, PipelineError> {
    state.parameters.as_mut().ok_or_else(|| {
        PipelineError::infrastructure(
            "run state has no experiment parameters; resume from the parse phase",
        )
    })
}

pub(crate) fn layout(state: &RunState) -> Result<&RunLayout, PipelineError> {
    state.layout.as_ref().ok_or_else(|| {
        PipelineError::infrastructure("run state has no layout; resume from the parse phase")
    })
}
