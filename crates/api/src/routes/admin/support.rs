//! Support ticket inbox for the super-admin dashboard

use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::shared::db_failure;
use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Serialize, FromRow)]
pub struct AdminTicketRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub restaurant_id: Option<Uuid>,
    pub restaurant_name: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub priority: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct AdminTicketListResponse {
    pub tickets: Vec<AdminTicketRow>,
    pub total: usize,
}

/// GET /admin/support/tickets
pub async fn list_tickets(State(state): State<AppState>) -> ApiResult<Json<AdminTicketListResponse>> {
    let req_id = Uuid::new_v4();

    let tickets: Vec<AdminTicketRow> = sqlx::query_as(
        r#"
        SELECT
            t.id,
            t.user_id,
            u.email as user_email,
            t.restaurant_id,
            r.name as restaurant_name,
            t.subject,
            t.message,
            t.status,
            t.priority,
            t.created_at,
            t.updated_at
        FROM support_tickets t
        LEFT JOIN auth.users u ON u.id = t.user_id
        LEFT JOIN restaurants r ON r.id = t.restaurant_id
        ORDER BY t.created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(db_failure(req_id, "list_tickets"))?;

    tracing::debug!(%req_id, count = tickets.len(), "list_tickets");

    Ok(Json(AdminTicketListResponse {
        total: tickets.len(),
        tickets,
    }))
}
