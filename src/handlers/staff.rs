use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::session::SESSION_TOKEN_HEADER,
    models::session::StaffSession,
    repositories::{department as department_repo, requirement as requirement_repo, staff as staff_repo},
    services::audit::AuditEvent,
    state::AppState,
};

/// The request payload for staff credential validation.
#[derive(Deserialize, Debug)]
pub struct ValidateStaffRequest {
    pub staff_id_number: String,
    pub email: String,
}

/// The request payload for department selection.
#[derive(Deserialize, Debug)]
pub struct SelectDepartmentRequest {
    pub staff_id_number: String,
    pub department_id: Uuid,
}

#[derive(Serialize)]
pub struct DepartmentSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize)]
pub struct RequirementSummary {
    pub id: Uuid,
    pub document_name: String,
    pub is_required: bool,
}

#[derive(Serialize)]
pub struct ValidateStaffResponse {
    pub valid: bool,
    pub staff_name: String,
    pub department: Option<DepartmentSummary>,
    /// Offered for selection when the staff member has no department yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<DepartmentSummary>>,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct SelectDepartmentResponse {
    pub session_token: String,
    pub expires_in: i64,
    pub staff_name: String,
    pub department_name: String,
    pub required_documents: Vec<RequirementSummary>,
}

/// Validates a staff member's credentials.
///
/// When the staff member has not picked a department yet, the response
/// carries the full department list so the client can offer the choice.
#[axum::debug_handler]
pub async fn validate_staff(
    State(state): State<AppState>,
    Json(payload): Json<ValidateStaffRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Staff validation attempt: {}", payload.staff_id_number);

    let staff = staff_repo::find_by_staff_number_and_email(
        &state.db,
        &payload.staff_id_number,
        &payload.email,
    )
    .await?;

    let Some(staff) = staff else {
        state.audit.record(AuditEvent::StaffValidation {
            staff_id_number: payload.staff_id_number.trim().to_string(),
            department_name: String::new(),
            details: "Validation failed: unknown staff number or email".to_string(),
        });
        return Err(AppError::Validation(
            "Invalid staff ID number or email".to_string(),
        ));
    };

    let department = match staff.department_id {
        Some(department_id) => Some(department_repo::find_by_id(&state.db, department_id).await?),
        None => None,
    };

    let department_name = department
        .as_ref()
        .map(|d| d.name.clone())
        .unwrap_or_default();

    state.audit.record(AuditEvent::StaffValidation {
        staff_id_number: staff.staff_id_number.clone(),
        department_name,
        details: "Staff credentials validated".to_string(),
    });

    tracing::info!("✅ Staff validated: {}", staff.staff_id_number);

    let departments = if department.is_none() {
        let all = department_repo::list_all(&state.db).await?;
        Some(
            all.into_iter()
                .map(|d| DepartmentSummary { id: d.id, name: d.name })
                .collect(),
        )
    } else {
        None
    };

    let response = sonic_rs::to_string(&ValidateStaffResponse {
        valid: true,
        staff_name: staff.full_name,
        department: department.map(|d| DepartmentSummary { id: d.id, name: d.name }),
        departments,
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, response).into_response())
}

/// Assigns a department to a staff member and opens an upload session.
#[axum::debug_handler]
pub async fn select_department(
    State(state): State<AppState>,
    Json(payload): Json<SelectDepartmentRequest>,
) -> Result<impl IntoResponse> {
    let staff = staff_repo::find_by_staff_number(&state.db, &payload.staff_id_number).await?;
    let department = department_repo::find_by_id(&state.db, payload.department_id).await?;

    staff_repo::assign_department(&state.db, staff.id, department.id).await?;
    tracing::info!(
        "✅ Department '{}' selected by staff {}",
        department.name,
        staff.staff_id_number
    );

    let requirements =
        requirement_repo::list_active_for_department(&state.db, department.id).await?;

    let session_token = state.sessions.create(staff.id, department.id);

    let response = sonic_rs::to_string(&SelectDepartmentResponse {
        session_token,
        expires_in: state.config.session_ttl_secs,
        staff_name: staff.full_name,
        department_name: department.name,
        required_documents: requirements
            .into_iter()
            .map(|r| RequirementSummary {
                id: r.id,
                document_name: r.document_name,
                is_required: r.is_required,
            })
            .collect(),
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, response).into_response())
}

/// Lists the active requirements for the session's department.
#[axum::debug_handler]
pub async fn list_requirements(
    State(state): State<AppState>,
    axum::Extension(session): axum::Extension<StaffSession>,
) -> Result<impl IntoResponse> {
    let requirements =
        requirement_repo::list_active_for_department(&state.db, session.department_id).await?;

    let response = sonic_rs::to_string(
        &requirements
            .into_iter()
            .map(|r| RequirementSummary {
                id: r.id,
                document_name: r.document_name,
                is_required: r.is_required,
            })
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, response).into_response())
}

/// Ends a session.
///
/// Deliberately outside the session middleware: logging out with an
/// unknown, expired, or missing token still reports success.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        state.sessions.invalidate(token);
    }

    let body = sonic_rs::to_string(&LogoutResponse {
        success: true,
        message: "Logged out".to_string(),
    })
    .unwrap_or_else(|_| r#"{"success":true,"message":"Logged out"}"#.to_string());

    (StatusCode::OK, body).into_response()
}
