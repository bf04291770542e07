use std::cmp::Ordering;

use axum::Json;
use axum::extract::State;
use common::SessionStatus;
use sea_orm::EntityTrait;
use tracing::instrument;

use crate::entity::participant;
use crate::error::AppError;
use crate::models::session::ParticipantResponse;
use crate::state::AppState;

/// Total order over sessions by successive tie-break keys:
/// completed patterns desc, finished desc, elapsed time asc, loop count asc,
/// lines of code asc, warnings asc, attempts asc. Sessions tying on all seven
/// keys keep their stable relative order.
fn compare_sessions(a: &participant::Model, b: &participant::Model) -> Ordering {
    b.patterns_completed
        .cmp(&a.patterns_completed)
        .then_with(|| {
            let a_finished = a.status == SessionStatus::Finished;
            let b_finished = b.status == SessionStatus::Finished;
            b_finished.cmp(&a_finished)
        })
        .then_with(|| a.total_time_ms.cmp(&b.total_time_ms))
        .then_with(|| a.no_of_loops.cmp(&b.no_of_loops))
        .then_with(|| a.lines_of_code.cmp(&b.lines_of_code))
        .then_with(|| a.warnings.cmp(&b.warnings))
        .then_with(|| a.attempts.cmp(&b.attempts))
}

/// Rank sessions in place. Recomputed fresh on every request; no cached rank
/// is ever persisted.
pub fn rank_sessions(sessions: &mut [participant::Model]) {
    sessions.sort_by(compare_sessions);
}

/// Current leaderboard over all sessions, including partially-completed ones.
#[utoipa::path(
    get,
    path = "/api/leaderboard",
    tag = "Leaderboard",
    operation_id = "leaderboard",
    summary = "All sessions in rank order",
    responses(
        (status = 200, description = "Ranked sessions", body = Vec<ParticipantResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    let mut sessions = participant::Entity::find().all(&state.db).await?;
    rank_sessions(&mut sessions);

    Ok(Json(
        sessions.into_iter().map(ParticipantResponse::from).collect(),
    ))
}
