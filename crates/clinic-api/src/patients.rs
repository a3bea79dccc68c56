use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};

use clinic_types::api::{CreatePatientRequest, DataResponse, PatientQuery, UpdatePatientRequest};
use clinic_types::models::PatientFilter;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

pub async fn list_patients(
    State(state): State<AppState>,
    query: Result<Query<PatientQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // An unparsable query string filters nothing rather than failing.
    let filter = match query {
        Ok(Query(query)) => query.into_filter(),
        Err(rejection) => {
            debug!("Ignoring patient query: {}", rejection.body_text());
            PatientFilter::All
        }
    };

    let patients = run_db(&state, move |db| db.list_patients(&filter)).await?;
    if patients.is_empty() {
        return Err(ApiError::EmptyResult);
    }

    Ok(Json(DataResponse::new("Success", patients)))
}

pub async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<CreatePatientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let patient = req.validate()?;

    let patient = run_db(&state, move |db| db.create_patient(&patient)).await?;
    info!("Created patient {}", patient.id);

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Patient is created successfully", patient)),
    ))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let patient_id = parse_id(&id)?;

    let patient = run_db(&state, move |db| db.get_patient(patient_id))
        .await?
        .ok_or_else(|| ApiError::patient_not_found(&id))?;

    Ok(Json(DataResponse::new("Success", patient)))
}

/// PUT/PATCH /patients/{id}. Blank fields leave the stored value untouched.
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePatientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if req.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one field should be present in the request.".into(),
        ));
    }
    let patient_id = parse_id(&id)?;
    let changes = match req.validate() {
        Ok(changes) => changes,
        // A missing record outranks bad values.
        Err(errors) => {
            if run_db(&state, move |db| db.get_patient(patient_id)).await?.is_none() {
                return Err(ApiError::patient_not_found(&id));
            }
            return Err(errors.into());
        }
    };

    let patient = run_db(&state, move |db| db.update_patient(patient_id, &changes))
        .await?
        .ok_or_else(|| ApiError::patient_not_found(&id))?;
    info!("Updated patient {}", patient.id);

    Ok(Json(DataResponse::new(
        format!("Patient's data with id {} is successfully updated", id),
        patient,
    )))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let patient_id = parse_id(&id)?;

    if !run_db(&state, move |db| db.delete_patient(patient_id)).await? {
        return Err(ApiError::patient_not_found(&id));
    }
    info!("Deleted patient {}", patient_id);

    Ok(StatusCode::NO_CONTENT)
}

// Ids that are not integers cannot name a row.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::patient_not_found(raw))
}
