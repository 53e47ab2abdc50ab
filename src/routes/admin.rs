// src/routes/admin.rs

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use validator::Validate;

use super::ValidJson;
use crate::auth::DistrictAdmin;
use crate::error::{AppError, AppResult};
use crate::events::DistrictSubscription;
use crate::models::{AdminReportView, DbId, MergedReport, ReportStatus, StatusChange};
use crate::services::status::{self, UpdateEffects};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReportBody {
    pub status: Option<ReportStatus>,
    pub department_id: Option<DbId>,
}

/// Every aggregate in the caller's district, most recently touched first.
pub async fn list_reports(
    State(state): State<AppState>,
    admin: DistrictAdmin,
) -> AppResult<Json<Vec<AdminReportView>>> {
    Ok(Json(state.store.district_reports(&admin.district_name).await?))
}

pub async fn update_report(
    State(state): State<AppState>,
    admin: DistrictAdmin,
    Path(id): Path<DbId>,
    ValidJson(body): ValidJson<UpdateReportBody>,
) -> AppResult<Json<MergedReport>> {
    let status = body
        .status
        .ok_or_else(|| AppError::validation("Status is required."))?;

    let effects = UpdateEffects {
        events: &state.events,
        notifier: &state.notifier,
        reward_points: state.config.resolution_reward_points,
    };
    let report = status::update_report(
        state.store.as_ref(),
        effects,
        admin.admin_id,
        &admin.district_name,
        id,
        StatusChange {
            status,
            department_id: body.department_id,
        },
    )
    .await?;
    Ok(Json(report))
}

/// WebSocket feed of report events for the caller's district.
pub async fn live_reports(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    admin: DistrictAdmin,
) -> impl IntoResponse {
    let subscription = state.events.subscribe(admin.district_name.clone());
    ws.on_upgrade(move |socket| stream_events(socket, subscription, admin))
}

async fn stream_events(socket: WebSocket, mut events: DistrictSubscription, admin: DistrictAdmin) {
    tracing::info!(admin_id = admin.admin_id, district = %admin.district_name, "live feed connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode report event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Clients only listen; pings are answered by axum.
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(admin_id = admin.admin_id, "live feed disconnected");
}
