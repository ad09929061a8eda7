use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::Validate;

/// Public shape of an employee record. The store's `_id` never appears here.
#[derive(Serialize, Deserialize, Validate, Debug, Clone, PartialEq)]
pub struct Employee {
    #[validate(length(min = 1))]
    pub employee_id: String,
    pub name: String,
    pub department: String,
    #[serde(deserialize_with = "deserialize_salary")]
    pub salary: i64,
    /// `YYYY-MM-DD`; only ever compared as a string.
    pub joining_date: String,
    pub skills: Vec<String>,
}

/// Partial update. `None` (absent or `null`) leaves the stored value untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EmployeeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_salary",
        skip_serializing_if = "Option::is_none"
    )]
    pub salary: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joining_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DepartmentSalary {
    pub department: String,
    pub avg_salary: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeleteConfirmation {
    pub status: String,
    pub employee_id: String,
}

impl DeleteConfirmation {
    pub fn deleted(employee_id: impl Into<String>) -> Self {
        Self {
            status: "deleted".to_string(),
            employee_id: employee_id.into(),
        }
    }
}

// Salaries written by older clients may be stored as doubles or text.
struct LenientSalary(i64);

impl<'de> Deserialize<'de> for LenientSalary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SalaryVisitor).map(LenientSalary)
    }
}

struct SalaryVisitor;

impl<'de> Visitor<'de> for SalaryVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer salary, or a whole number encoded as float or string")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
        i64::try_from(value).map_err(|_| E::custom("salary out of range"))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
        if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
            Ok(value as i64)
        } else {
            Err(E::custom(format!("salary {} is not a whole number", value)))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
        if let Ok(parsed) = value.parse::<i64>() {
            return Ok(parsed);
        }
        let parsed = value
            .parse::<f64>()
            .map_err(|_| E::custom(format!("salary {:?} is not numeric", value)))?;
        self.visit_f64(parsed)
    }
}

fn deserialize_salary<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    LenientSalary::deserialize(deserializer).map(|salary| salary.0)
}

fn deserialize_optional_salary<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LenientSalary>::deserialize(deserializer)?.map(|salary| salary.0))
}
