use serde::{Deserialize, Deserializer, Serialize};

/// One compute offering as listed by the marketplace.
///
/// Absent keys and JSON `null` decode to the zero value of the field, which
/// the validator then reports as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cluster_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hash: String,
    /// Megabytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory: i64,
    #[serde(rename = "nb_gpu", default, deserialize_with = "null_as_default")]
    pub gpus: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_per_hour: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,
    /// Gigabytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub storage: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of checking a single record against the known schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    /// Position of the record in the response array.
    pub index: usize,
    pub valid: bool,
    /// Sorted wire names of fields holding their zero value.
    pub missing: Vec<String>,
    /// Sorted raw keys outside the allow-list.
    pub unexpected: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListResult {
    pub machines: Vec<MachineRecord>,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Records with at least one missing field.
    pub missing_fields: usize,
    /// Records with at least one unexpected field.
    pub unexpected_fields: usize,
    pub rejected: Vec<ValidationOutcome>,
}

/// Advisory messages about schema drift. None of these fail an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum Warning {
    MissingFields {
        index: usize,
        fields: Vec<String>,
    },
    UnexpectedFields {
        index: usize,
        fields: Vec<String>,
    },
    SchemaMismatch {
        invalid: usize,
        missing_fields: usize,
        unexpected_fields: usize,
        total: usize,
        valid: usize,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MissingFields { fields, .. } => {
                write!(f, "Machine is missing expected fields: {}", fields.join(", "))
            }
            Warning::UnexpectedFields { fields, .. } => {
                write!(f, "API returned unexpected fields: {}", fields.join(", "))
            }
            Warning::SchemaMismatch { invalid, total, .. } => write!(
                f,
                "{invalid} out of {total} machines were ignored due to schema mismatches."
            ),
        }
    }
}

/// Where the core sends advisory output. The core never prints on its own.
pub trait Sink {
    fn log(&self, message: &str);
    fn warn(&self, warning: &Warning);
}
