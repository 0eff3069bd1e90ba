use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OfficeHoursStatus {
    pub out_of_office: bool,
    pub local_hour: u32,
    pub timezone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub cooldown: HealthCheck,
    pub tracked_conversations: usize,
    pub office_hours: OfficeHoursStatus,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let responder = &state.responder;
    let now = responder.now();
    let office_hours = responder.settings().office_hours;
    let gate = responder.gate();
    // The cooldown map is never pruned.
    let tracked_conversations = gate.tracked_keys();

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "afterhours auto-responder initialized".to_string(),
        },
        cooldown: HealthCheck {
            status: "ready",
            detail: format!(
                "{tracked_conversations} conversation(s) tracked with a {}s window",
                gate.window().num_seconds()
            ),
        },
        tracked_conversations,
        office_hours: OfficeHoursStatus {
            out_of_office: office_hours.is_out_of_office(now),
            local_hour: office_hours.local_hour(now),
            timezone: office_hours.timezone().to_string(),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
