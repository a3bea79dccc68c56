use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Credentials, NewPatient, PatientChanges, PatientFilter, Registration, SortColumn, SortOrder,
};
use crate::validation::{ValidationErrors, filled};

// -- JWT Claims --

/// Bearer token payload. `sub` is the user id; `jti` makes every login's
/// token distinct. There is deliberately no `exp` claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: usize,
    pub jti: Uuid,
}

// -- Envelopes --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

// -- Auth --
//
// Request fields are all optional so that a missing field surfaces as a
// validation message rather than a deserialization failure.

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.required("name", self.name);
        let email = errors.required("email", self.email);
        errors.email("email", &email);
        // Passwords are taken verbatim; only emptiness is checked.
        let password = match self.password.filter(|p| !p.is_empty()) {
            Some(p) => p,
            None => errors.required("password", None),
        };
        errors.finish(|| Registration {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = errors.required("email", self.email);
        errors.email("email", &email);
        let password = match self.password.filter(|p| !p.is_empty()) {
            Some(p) => p,
            None => errors.required("password", None),
        };
        errors.finish(|| Credentials { email, password })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

// -- Patients --

#[derive(Debug, Default, Deserialize)]
pub struct CreatePatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub in_date_at: Option<String>,
    pub out_date_at: Option<String>,
}

impl CreatePatientRequest {
    pub fn validate(self) -> Result<NewPatient, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.required("name", self.name);
        let phone = errors.required("phone", self.phone);
        let address = errors.required("address", self.address);
        let status = match filled(self.status) {
            Some(raw) => errors.status("status", Some(raw)),
            None => {
                errors.required("status", None);
                None
            }
        };
        let in_date_at = errors.date("in_date_at", self.in_date_at);
        let out_date_at = errors.date("out_date_at", self.out_date_at);

        match status {
            Some(status) => errors.finish(|| NewPatient {
                name,
                phone,
                address,
                status,
                in_date_at,
                out_date_at,
            }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub in_date_at: Option<String>,
    pub out_date_at: Option<String>,
}

impl UpdatePatientRequest {
    /// True when no field carries a non-blank value.
    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.phone,
            &self.address,
            &self.status,
            &self.in_date_at,
            &self.out_date_at,
        ]
        .into_iter()
        .all(|field| field.as_deref().is_none_or(|v| v.trim().is_empty()))
    }

    pub fn validate(self) -> Result<PatientChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let changes = PatientChanges {
            name: filled(self.name),
            phone: filled(self.phone),
            address: filled(self.address),
            status: errors.status("status", self.status),
            in_date_at: errors.date("in_date_at", self.in_date_at),
            out_date_at: errors.date("out_date_at", self.out_date_at),
        };
        errors.finish(|| changes)
    }
}

/// Query string of `GET /patients`.
#[derive(Debug, Default, Deserialize)]
pub struct PatientQuery {
    pub name: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl PatientQuery {
    /// Picks the first axis present: name, address, status, then sort+order.
    pub fn into_filter(self) -> PatientFilter {
        if let Some(name) = filled(self.name) {
            return PatientFilter::Name(name);
        }
        if let Some(address) = filled(self.address) {
            return PatientFilter::Address(address);
        }
        if let Some(status) = filled(self.status) {
            return PatientFilter::Status(status);
        }
        let column = self.sort.as_deref().and_then(SortColumn::parse);
        let order = self.order.as_deref().and_then(SortOrder::parse);
        match (column, order) {
            (Some(column), Some(order)) => PatientFilter::Sorted { column, order },
            _ => PatientFilter::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientStatus;

    fn budi() -> CreatePatientRequest {
        CreatePatientRequest {
            name: Some("Budi".into()),
            phone: Some("08123".into()),
            address: Some("Jakarta".into()),
            status: Some("positif".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_requires_core_fields() {
        let errors = CreatePatientRequest::default().validate().unwrap_err();
        for field in ["name", "phone", "address", "status"] {
            assert!(errors.has(field), "missing error for {field}");
        }
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn create_rejects_unknown_status() {
        let req = CreatePatientRequest {
            status: Some("unknown".into()),
            ..budi()
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.to_string(), "The selected status is invalid.");
    }

    #[test]
    fn create_accepts_every_status() {
        for status in PatientStatus::ALL {
            let req = CreatePatientRequest {
                status: Some(status.to_string()),
                ..budi()
            };
            assert_eq!(req.validate().unwrap().status, status);
        }
    }

    #[test]
    fn create_parses_optional_dates() {
        let req = CreatePatientRequest {
            in_date_at: Some("2021-07-01".into()),
            out_date_at: Some("".into()),
            ..budi()
        };
        let patient = req.validate().unwrap();
        assert_eq!(patient.in_date_at.unwrap().to_string(), "2021-07-01");
        assert_eq!(patient.out_date_at, None);
    }

    #[test]
    fn update_emptiness_ignores_blank_strings() {
        let req = UpdatePatientRequest {
            name: Some("".into()),
            phone: Some("  ".into()),
            ..Default::default()
        };
        assert!(req.is_empty());

        let req = UpdatePatientRequest {
            phone: Some("123".into()),
            ..Default::default()
        };
        assert!(!req.is_empty());
    }

    #[test]
    fn update_keeps_only_supplied_fields() {
        let req = UpdatePatientRequest {
            phone: Some("123".into()),
            address: Some("".into()),
            ..Default::default()
        };
        let changes = req.validate().unwrap();
        assert_eq!(
            changes,
            PatientChanges {
                phone: Some("123".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn login_requires_valid_email() {
        let req = LoginRequest {
            email: Some("budi".into()),
            password: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("password"));
    }

    #[test]
    fn query_takes_first_axis_only() {
        let query = PatientQuery {
            address: Some("Bandung".into()),
            status: Some("sembuh".into()),
            ..Default::default()
        };
        assert_eq!(query.into_filter(), PatientFilter::Address("Bandung".into()));
    }

    #[test]
    fn query_needs_both_sort_and_order() {
        let query = PatientQuery {
            sort: Some("tanggal_masuk".into()),
            ..Default::default()
        };
        assert_eq!(query.into_filter(), PatientFilter::All);

        let query = PatientQuery {
            sort: Some("tanggal_masuk".into()),
            order: Some("DESC".into()),
            ..Default::default()
        };
        assert_eq!(
            query.into_filter(),
            PatientFilter::Sorted {
                column: SortColumn::InDate,
                order: SortOrder::Desc
            }
        );
    }
}
