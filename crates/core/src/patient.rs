//! Patient and visit records as exchanged with the remote store.
//!
//! Wire names follow the store's camelCase columns. Records read back from the store come
//! from spreadsheet cells, so a phone number may arrive as a JSON number and an age as a
//! string; decoding accepts any scalar for text fields.

use chrono::NaiveDate;
use frontdesk_types::{NonEmptyText, PhoneNumber};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::MAX_AGE;
use crate::{DeskError, DeskResult};

/// Sex options offered by the registration form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    Male,
    Female,
    Other,
}

impl std::str::FromStr for Sex {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" | "o" => Ok(Self::Other),
            other => Err(DeskError::InvalidInput(format!("unknown sex: {other}"))),
        }
    }
}

/// A patient as registered at the front desk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient_sex")]
    pub sex: Sex,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub state: String,
    /// ISO `YYYY-MM-DD`, or empty when unknown.
    #[serde(rename = "dob", default, deserialize_with = "lenient_text")]
    pub date_of_birth: String,
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: u32,
}

impl PatientRecord {
    /// Check the fields the registration form marks as required or constrained.
    ///
    /// # Errors
    /// Returns [`DeskError::InvalidInput`] if the phone or first name is missing/invalid, the
    /// age is out of range, or the date of birth is not an ISO date.
    pub fn validate(&self) -> DeskResult<()> {
        PhoneNumber::new(&self.phone)?;
        NonEmptyText::new(&self.first_name)
            .map_err(|_| DeskError::InvalidInput("first name is required".into()))?;

        if self.age > MAX_AGE {
            return Err(DeskError::InvalidInput(format!(
                "age must be between 0 and {MAX_AGE}"
            )));
        }

        if !self.date_of_birth.trim().is_empty() {
            parse_iso_date(&self.date_of_birth)?;
        }

        Ok(())
    }

    /// Trimmed copy with `default_state` filled in when the state is blank.
    pub fn normalised(&self, default_state: &str) -> Self {
        let state = if self.state.trim().is_empty() {
            default_state.to_string()
        } else {
            self.state.trim().to_string()
        };

        Self {
            phone: self.phone.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            sex: self.sex,
            city: self.city.trim().to_string(),
            state,
            date_of_birth: self.date_of_birth.trim().to_string(),
            age: self.age,
        }
    }

    /// "First Last" for the active patient banner.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// One consultation as stored in the visit history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub patient_phone: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub symptoms: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub diagnosis: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub prescription: String,
}

/// Consultation form contents before they are bound to a patient and prescription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitDraft {
    pub date: NaiveDate,
    pub symptoms: String,
    #[serde(default)]
    pub diagnosis: String,
}

impl VisitDraft {
    /// A blank consultation for `date`, with the symptoms field pre-filled as `"{date}; "`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            symptoms: format!("{}; ", date.format("%Y-%m-%d")),
            diagnosis: String::new(),
        }
    }

    /// Bind the draft to a patient and prescription.
    pub fn into_visit(self, patient_phone: &str, prescription: &str) -> VisitRecord {
        VisitRecord {
            patient_phone: patient_phone.to_string(),
            date: self.date.format("%Y-%m-%d").to_string(),
            symptoms: self.symptoms,
            diagnosis: self.diagnosis,
            prescription: prescription.to_string(),
        }
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(value: &str) -> DeskResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DeskError::InvalidInput(format!("expected a YYYY-MM-DD date, got {value:?}")))
}

fn scalar_to_text(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected a scalar value, got {other}")),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    scalar_to_text(value).map_err(serde::de::Error::custom)
}

fn lenient_sex<'de, D>(deserializer: D) -> Result<Sex, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_text(deserializer)?;
    if text.trim().is_empty() {
        return Ok(Sex::default());
    }
    text.parse().map_err(serde::de::Error::custom)
}

fn lenient_age<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_text(deserializer)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    // Sheets hand numeric cells back as floats ("34.0"); only whole numbers are ages.
    text.parse::<f64>()
        .ok()
        .filter(|age| {
            age.is_finite() && *age >= 0.0 && age.fract() == 0.0 && *age <= f64::from(u32::MAX)
        })
        .map(|age| age as u32)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid age: {text}")))
}
