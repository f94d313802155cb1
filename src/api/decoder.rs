use serde::Deserialize;
use snafu::{IntoError, ResultExt};

use crate::common::{MachineRecord, MalformedJsonSnafu, Result, ShapeMismatchSnafu};

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    computers: Option<Vec<serde_json::Value>>,
}

/// A record together with the keys it carried on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub record: MachineRecord,
    pub raw_keys: Vec<String>,
}

fn decode_failure(source: serde_json::Error, raw: &[u8]) -> crate::common::Error {
    let body = String::from_utf8_lossy(raw).into_owned();
    match source.is_data() {
        true => ShapeMismatchSnafu { body }.into_error(source),
        false => MalformedJsonSnafu { body }.into_error(source),
    }
}

/// Decode a `{"computers": [...]}` body.
///
/// An empty, `null` or absent array is an empty success. A `null` element
/// becomes a zero record with no keys. Invalid JSON, a non-object envelope,
/// a non-object element or a field of the wrong type fail the whole body.
pub fn decode(raw: &[u8]) -> Result<Vec<DecodedRecord>> {
    let envelope: Envelope =
        serde_json::from_slice(raw).map_err(|source| decode_failure(source, raw))?;

    let items = envelope.computers.unwrap_or_default();
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        // A null element carries no keys; it decodes to a zero record and is
        // rejected by the validator like any other incomplete one.
        let (record, raw_keys) = match item {
            serde_json::Value::Null => (MachineRecord::default(), Vec::new()),
            serde_json::Value::Object(object) => {
                let record = MachineRecord::deserialize(item).context(ShapeMismatchSnafu {
                    body: String::from_utf8_lossy(raw).into_owned(),
                })?;
                (record, object.keys().cloned().collect())
            }
            _ => {
                let source = <serde_json::Error as serde::de::Error>::custom(format!(
                    "computers[{index}] is not an object"
                ));
                return Err(ShapeMismatchSnafu {
                    body: String::from_utf8_lossy(raw).into_owned(),
                }
                .into_error(source));
            }
        };
        records.push(DecodedRecord { record, raw_keys });
    }

    Ok(records)
}
