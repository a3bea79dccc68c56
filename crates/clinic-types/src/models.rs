use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Public view of a registered user. The password hash never leaves the DB crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    /// Tested positive, under care.
    Positif,
    /// Recovered.
    Sembuh,
    /// Deceased.
    Meninggal,
}

impl PatientStatus {
    pub const ALL: [PatientStatus; 3] = [
        PatientStatus::Positif,
        PatientStatus::Sembuh,
        PatientStatus::Meninggal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Positif => "positif",
            PatientStatus::Sembuh => "sembuh",
            PatientStatus::Meninggal => "meninggal",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown patient status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PatientStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatientStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub status: PatientStatus,
    pub in_date_at: Option<NaiveDate>,
    pub out_date_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Commands --
//
// Produced by the request types in `api` once validation has passed. The DB
// layer only ever sees these.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub status: PatientStatus,
    pub in_date_at: Option<NaiveDate>,
    pub out_date_at: Option<NaiveDate>,
}

/// Fields to overwrite on an existing patient. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<PatientStatus>,
    pub in_date_at: Option<NaiveDate>,
    pub out_date_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// -- Listing --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    InDate,
    OutDate,
    Address,
}

impl SortColumn {
    /// Accepts the column names and the Indonesian aliases used by older clients.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "in_date_at" | "tanggal_masuk" => Some(SortColumn::InDate),
            "out_date_at" | "tanggal_keluar" => Some(SortColumn::OutDate),
            "address" => Some(SortColumn::Address),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortColumn::InDate => "in_date_at",
            SortColumn::OutDate => "out_date_at",
            SortColumn::Address => "address",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A single listing criterion. Filters never combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientFilter {
    Name(String),
    Address(String),
    Status(String),
    Sorted { column: SortColumn, order: SortOrder },
    All,
}
