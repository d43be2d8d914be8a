//! Raw form submissions and their validation.
//!
//! Each form holds the text fields exactly as entered. `validate` trims
//! them, checks them, and produces the typed value the storage and workflow
//! layers accept. Nothing is written until a form has validated.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{ValidationConfig, WorkflowConfig};
use crate::error::{Error, Result};
use crate::models::{BloodGroup, Gender, NewBloodRequest, NewDonor, Urgency};
use crate::workflow::{CollectionInput, ScreeningInput};

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(field, "is required"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn optional_email(value: Option<&str>) -> Result<Option<String>> {
    let email = optional(value);
    if let Some(email) = &email {
        if !email_regex().is_match(email) {
            return Err(Error::validation("email", "is not a valid email address"));
        }
    }
    Ok(email)
}

fn choice<T: FromStr>(field: &'static str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    required(field, value)?
        .parse()
        .map_err(|e: T::Err| Error::validation(field, e.to_string()))
}

fn positive_decimal(field: &'static str, value: &str) -> Result<f64> {
    let parsed: f64 = required(field, value)?
        .parse()
        .map_err(|_| Error::validation(field, "must be a number"))?;
    if parsed.is_finite() && parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(Error::validation(field, "must be a positive number"))
    }
}

fn positive_integer(field: &'static str, value: &str) -> Result<u32> {
    let parsed: u32 = required(field, value)?
        .parse()
        .map_err(|_| Error::validation(field, "must be a whole number"))?;
    if parsed == 0 {
        return Err(Error::validation(field, "must be greater than zero"));
    }
    Ok(parsed)
}

/// Donor self-registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    /// Full name.
    pub name: String,
    /// Age in years.
    pub age: String,
    /// `M`, `F` or `O`.
    pub gender: String,
    /// One of the eight groups, e.g. `AB-`.
    pub blood_group: String,
    /// Phone number.
    pub contact: String,
    /// Optional email address.
    pub email: Option<String>,
    /// Optional postal address.
    pub address: Option<String>,
}

impl RegistrationForm {
    /// Check the form against the configured age range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first bad field.
    pub fn validate(&self, rules: &ValidationConfig) -> Result<NewDonor> {
        let name = required("name", &self.name)?;
        let age_text = required("age", &self.age)?;
        let gender: Gender = choice("gender", &self.gender)?;
        let blood_group: BloodGroup = choice("blood group", &self.blood_group)?;
        let contact = required("contact", &self.contact)?;

        let out_of_range = || {
            Error::validation(
                "age",
                format!(
                    "must be between {} and {} years",
                    rules.min_donor_age, rules.max_donor_age
                ),
            )
        };
        let age: i64 = age_text
            .parse()
            .map_err(|_| Error::validation("age", "must be a whole number"))?;
        let age = u8::try_from(age).map_err(|_| out_of_range())?;
        if !(rules.min_donor_age..=rules.max_donor_age).contains(&age) {
            return Err(out_of_range());
        }

        Ok(NewDonor {
            name,
            age,
            gender,
            blood_group,
            contact,
            email: optional_email(self.email.as_deref())?,
            address: optional(self.address.as_deref()),
        })
    }
}

/// Vital signs taken at screening.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningForm {
    /// Free text, e.g. `120/80`.
    pub blood_pressure: String,
    /// g/dL.
    pub hemoglobin: String,
    /// kg.
    pub weight: String,
    /// °C.
    pub temperature: String,
    /// Beats per minute.
    pub pulse: String,
    /// Optional remarks.
    pub notes: Option<String>,
}

impl ScreeningForm {
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<ScreeningInput> {
        Ok(ScreeningInput {
            blood_pressure: required("blood pressure", &self.blood_pressure)?,
            hemoglobin: positive_decimal("hemoglobin", &self.hemoglobin)?,
            weight: positive_decimal("weight", &self.weight)?,
            temperature: positive_decimal("temperature", &self.temperature)?,
            pulse: positive_integer("pulse", &self.pulse)?,
            notes: optional(self.notes.as_deref()),
        })
    }
}

/// Blood collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionForm {
    /// Millilitres collected. Blank means the configured default.
    pub quantity_ml: String,
    /// Optional remarks.
    pub notes: Option<String>,
}

impl CollectionForm {
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the quantity is not a positive
    /// whole number.
    pub fn validate(&self, workflow: &WorkflowConfig) -> Result<CollectionInput> {
        let quantity_ml = if self.quantity_ml.trim().is_empty() {
            workflow.default_quantity_ml
        } else {
            positive_integer("quantity", &self.quantity_ml)?
        };

        Ok(CollectionInput {
            quantity_ml,
            notes: optional(self.notes.as_deref()),
        })
    }
}

/// A hospital's request for blood.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodRequestForm {
    /// Requesting hospital.
    pub hospital_name: String,
    /// Person to talk to.
    pub contact_person: String,
    /// Phone number.
    pub phone: String,
    /// Optional email address.
    pub email: Option<String>,
    /// Requested group.
    pub blood_group: String,
    /// Number of units.
    pub units: String,
    /// `Emergency`, `Urgent` or `Normal`. Blank means `Normal`.
    pub urgency: Option<String>,
    /// Optional description of the medical situation.
    pub reason: Option<String>,
}

impl BloodRequestForm {
    /// Check the form against the configured unit range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first bad field.
    pub fn validate(&self, rules: &ValidationConfig) -> Result<NewBloodRequest> {
        let hospital_name = required("hospital name", &self.hospital_name)?;
        let contact_person = required("contact person", &self.contact_person)?;
        let contact = required("phone", &self.phone)?;
        let blood_group: BloodGroup = choice("blood group", &self.blood_group)?;
        let units_text = required("units", &self.units)?;

        let out_of_range = || {
            Error::validation(
                "units",
                format!(
                    "must be between {} and {}",
                    rules.min_request_units, rules.max_request_units
                ),
            )
        };
        let units: i64 = units_text
            .parse()
            .map_err(|_| Error::validation("units", "must be a whole number"))?;
        let units_requested = u32::try_from(units).map_err(|_| out_of_range())?;
        if !(rules.min_request_units..=rules.max_request_units).contains(&units_requested) {
            return Err(out_of_range());
        }

        let urgency = match optional(self.urgency.as_deref()) {
            Some(text) => choice("urgency", &text)?,
            None => Urgency::default(),
        };

        Ok(NewBloodRequest {
            hospital_name,
            contact_person,
            contact,
            email: optional_email(self.email.as_deref())?,
            blood_group,
            units_requested,
            urgency,
            reason: optional(self.reason.as_deref()),
        })
    }
}

/// Sign-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Operator username.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if either field is blank.
    pub fn validate(&self) -> Result<Credentials> {
        let username = required("username", &self.username)?;
        if self.password.is_empty() {
            return Err(Error::validation("password", "is required"));
        }
        Ok(Credentials {
            username,
            password: self.password.clone(),
        })
    }
}

/// A username and password that passed [`LoginForm::validate`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Operator username, trimmed.
    pub username: String,
    /// Password, exactly as typed.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            name: "  Priya Nair ".to_string(),
            age: "29".to_string(),
            gender: "F".to_string(),
            blood_group: "o-".to_string(),
            contact: "555-0111".to_string(),
            email: Some("priya@example.com".to_string()),
            address: Some("   ".to_string()),
        }
    }

    fn request() -> BloodRequestForm {
        BloodRequestForm {
            hospital_name: "General".to_string(),
            contact_person: "Dr. Ode".to_string(),
            phone: "555-0400".to_string(),
            email: None,
            blood_group: "A+".to_string(),
            units: "5".to_string(),
            urgency: None,
            reason: None,
        }
    }

    fn field_of(err: &Error) -> &'static str {
        match err {
            Error::Validation { field, .. } => *field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_registration_valid() {
        let donor = registration().validate(&ValidationConfig::default()).unwrap();
        assert_eq!(donor.name, "Priya Nair");
        assert_eq!(donor.age, 29);
        assert_eq!(donor.gender, Gender::Female);
        assert_eq!(donor.blood_group, BloodGroup::ONegative);
        assert_eq!(donor.email.as_deref(), Some("priya@example.com"));
        assert!(donor.address.is_none());
    }

    #[test]
    fn test_registration_age_bounds() {
        let rules = ValidationConfig::default();
        for (age, ok) in [("17", false), ("18", true), ("65", true), ("66", false), ("300", false), ("-4", false)] {
            let form = RegistrationForm {
                age: age.to_string(),
                ..registration()
            };
            let result = form.validate(&rules);
            assert_eq!(result.is_ok(), ok, "age {age}");
            if let Err(err) = result {
                assert_eq!(field_of(&err), "age");
                assert!(err.to_string().contains("between 18 and 65"));
            }
        }
    }

    #[test]
    fn test_registration_missing_fields() {
        let rules = ValidationConfig::default();
        let form = RegistrationForm {
            contact: " ".to_string(),
            ..registration()
        };
        assert_eq!(field_of(&form.validate(&rules).unwrap_err()), "contact");

        let form = RegistrationForm {
            age: "twenty".to_string(),
            ..registration()
        };
        assert_eq!(field_of(&form.validate(&rules).unwrap_err()), "age");

        let form = RegistrationForm {
            blood_group: "C+".to_string(),
            ..registration()
        };
        assert_eq!(field_of(&form.validate(&rules).unwrap_err()), "blood group");
    }

    #[test]
    fn test_registration_bad_email() {
        let form = RegistrationForm {
            email: Some("not-an-email".to_string()),
            ..registration()
        };
        let err = form.validate(&ValidationConfig::default()).unwrap_err();
        assert_eq!(field_of(&err), "email");
    }

    #[test]
    fn test_screening_valid() {
        let form = ScreeningForm {
            blood_pressure: "120/80".to_string(),
            hemoglobin: "13.8".to_string(),
            weight: "68".to_string(),
            temperature: "36.7".to_string(),
            pulse: "72".to_string(),
            notes: None,
        };
        let input = form.validate().unwrap();
        assert_eq!(input.pulse, 72);
        assert!((input.hemoglobin - 13.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screening_rejects_bad_numbers() {
        let base = ScreeningForm {
            blood_pressure: "120/80".to_string(),
            hemoglobin: "13.8".to_string(),
            weight: "68".to_string(),
            temperature: "36.7".to_string(),
            pulse: "72".to_string(),
            notes: None,
        };

        let form = ScreeningForm {
            hemoglobin: "NaN".to_string(),
            ..base.clone()
        };
        assert_eq!(field_of(&form.validate().unwrap_err()), "hemoglobin");

        let form = ScreeningForm {
            weight: "-1".to_string(),
            ..base.clone()
        };
        assert_eq!(field_of(&form.validate().unwrap_err()), "weight");

        let form = ScreeningForm {
            pulse: "72.5".to_string(),
            ..base.clone()
        };
        assert_eq!(field_of(&form.validate().unwrap_err()), "pulse");

        let form = ScreeningForm {
            blood_pressure: String::new(),
            ..base
        };
        assert_eq!(field_of(&form.validate().unwrap_err()), "blood pressure");
    }

    #[test]
    fn test_collection_default_quantity() {
        let workflow = WorkflowConfig::default();
        let input = CollectionForm::default().validate(&workflow).unwrap();
        assert_eq!(input.quantity_ml, 450);

        let input = CollectionForm {
            quantity_ml: "350".to_string(),
            notes: Some("left arm".to_string()),
        }
        .validate(&workflow)
        .unwrap();
        assert_eq!(input.quantity_ml, 350);
        assert_eq!(input.notes.as_deref(), Some("left arm"));

        let err = CollectionForm {
            quantity_ml: "0".to_string(),
            notes: None,
        }
        .validate(&workflow)
        .unwrap_err();
        assert_eq!(field_of(&err), "quantity");
    }

    #[test]
    fn test_request_valid_defaults_to_normal() {
        let req = request().validate(&ValidationConfig::default()).unwrap();
        assert_eq!(req.urgency, Urgency::Normal);
        assert_eq!(req.units_requested, 5);
        assert_eq!(req.contact, "555-0400");
    }

    #[test]
    fn test_request_units_bounds() {
        let rules = ValidationConfig::default();
        for (units, ok) in [("0", false), ("1", true), ("50", true), ("51", false), ("-3", false)] {
            let form = BloodRequestForm {
                units: units.to_string(),
                ..request()
            };
            let result = form.validate(&rules);
            assert_eq!(result.is_ok(), ok, "units {units}");
            if let Err(err) = result {
                assert!(err.to_string().contains("between 1 and 50"));
            }
        }
    }

    #[test]
    fn test_request_blank_required_field() {
        let form = BloodRequestForm {
            hospital_name: "   ".to_string(),
            ..request()
        };
        let err = form.validate(&ValidationConfig::default()).unwrap_err();
        assert_eq!(field_of(&err), "hospital name");
    }

    #[test]
    fn test_request_urgency_parsed() {
        let form = BloodRequestForm {
            urgency: Some("emergency".to_string()),
            ..request()
        };
        let req = form.validate(&ValidationConfig::default()).unwrap();
        assert_eq!(req.urgency, Urgency::Emergency);

        let form = BloodRequestForm {
            urgency: Some("whenever".to_string()),
            ..request()
        };
        let err = form.validate(&ValidationConfig::default()).unwrap_err();
        assert_eq!(field_of(&err), "urgency");
    }

    #[test]
    fn test_login_form() {
        let creds = LoginForm {
            username: " root ".to_string(),
            password: "pw".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(creds.username, "root");
        assert!(!format!("{creds:?}").contains("pw\""));

        let err = LoginForm::default().validate().unwrap_err();
        assert_eq!(field_of(&err), "username");
    }
}
