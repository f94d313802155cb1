//! Schema drift detection for decoded machine records.
//!
//! A field is "missing" when it holds the zero value of its type. This is a
//! heuristic: a machine that really has zero GPUs or zero storage is
//! indistinguishable from one where the key was omitted, and is rejected.

use crate::common::{ListResult, MachineRecord, Sink, ValidationOutcome, Warning};

use super::DecodedRecord;

pub struct FieldSpec {
    /// Key on the wire.
    pub name: &'static str,
    pub is_missing: fn(&MachineRecord) -> bool,
}

/// Every recognised key, in wire order. Doubles as the allow-list.
pub const MACHINE_FIELDS: [FieldSpec; 8] = [
    FieldSpec {
        name: "cluster_name",
        is_missing: |m| m.cluster_name.is_empty(),
    },
    FieldSpec {
        name: "cpu",
        is_missing: |m| m.cpu.is_empty(),
    },
    FieldSpec {
        name: "hash",
        is_missing: |m| m.hash.is_empty(),
    },
    FieldSpec {
        name: "memory",
        is_missing: |m| m.memory == 0,
    },
    FieldSpec {
        name: "nb_gpu",
        is_missing: |m| m.gpus == 0,
    },
    FieldSpec {
        name: "price_per_hour",
        is_missing: |m| m.price_per_hour == 0.0,
    },
    FieldSpec {
        name: "region",
        is_missing: |m| m.region.is_empty(),
    },
    FieldSpec {
        name: "storage",
        is_missing: |m| m.storage == 0,
    },
];

pub fn is_known_field(key: &str) -> bool {
    MACHINE_FIELDS.iter().any(|field| field.name == key)
}

/// Check one record. `raw_keys` are the keys of the record's JSON object
/// before decoding.
pub fn validate<'a>(
    index: usize,
    record: &MachineRecord,
    raw_keys: impl IntoIterator<Item = &'a str>,
) -> ValidationOutcome {
    let mut missing: Vec<String> = MACHINE_FIELDS
        .iter()
        .filter(|field| (field.is_missing)(record))
        .map(|field| field.name.to_string())
        .collect();
    missing.sort();

    let mut unexpected: Vec<String> = raw_keys
        .into_iter()
        .filter(|key| !is_known_field(key))
        .map(str::to_string)
        .collect();
    unexpected.sort();
    unexpected.dedup();

    ValidationOutcome {
        index,
        valid: missing.is_empty() && unexpected.is_empty(),
        missing,
        unexpected,
    }
}

/// Validate every record independently. Rejected records are dropped from
/// the result and reported through `sink`; they never fail the batch.
pub fn validate_batch(records: Vec<DecodedRecord>, sink: &dyn Sink) -> ListResult {
    let mut result = ListResult {
        total: records.len(),
        ..Default::default()
    };

    for (index, decoded) in records.into_iter().enumerate() {
        let outcome = validate(
            index,
            &decoded.record,
            decoded.raw_keys.iter().map(String::as_str),
        );
        if outcome.valid {
            result.machines.push(decoded.record);
            continue;
        }

        if !outcome.missing.is_empty() {
            result.missing_fields += 1;
            sink.warn(&Warning::MissingFields {
                index,
                fields: outcome.missing.clone(),
            });
        }
        if !outcome.unexpected.is_empty() {
            result.unexpected_fields += 1;
            sink.warn(&Warning::UnexpectedFields {
                index,
                fields: outcome.unexpected.clone(),
            });
        }
        result.rejected.push(outcome);
    }

    result.valid = result.machines.len();
    result.invalid = result.rejected.len();

    if result.invalid > 0 {
        sink.warn(&Warning::SchemaMismatch {
            invalid: result.invalid,
            missing_fields: result.missing_fields,
            unexpected_fields: result.unexpected_fields,
            total: result.total,
            valid: result.valid,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Warning>>);

    impl Sink for Recorder {
        fn log(&self, _message: &str) {}

        fn warn(&self, warning: &Warning) {
            self.0.borrow_mut().push(warning.clone());
        }
    }

    fn complete() -> MachineRecord {
        MachineRecord {
            cluster_name: "c1".into(),
            cpu: "x86".into(),
            hash: "abc".into(),
            memory: 1024,
            gpus: 2,
            price_per_hour: 0.5,
            region: "us".into(),
            storage: 100,
        }
    }

    fn wire_keys() -> Vec<String> {
        MACHINE_FIELDS
            .iter()
            .map(|field| field.name.to_string())
            .collect()
    }

    #[test]
    fn field_table_is_sorted_and_unique() {
        let names: Vec<_> = MACHINE_FIELDS.iter().map(|f| f.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn complete_record_is_valid() {
        let keys = wire_keys();
        let outcome = validate(0, &complete(), keys.iter().map(String::as_str));
        assert!(outcome.valid);
        assert!(outcome.missing.is_empty());
        assert!(outcome.unexpected.is_empty());
    }

    #[test]
    fn zero_values_are_missing() {
        let record = MachineRecord {
            storage: 0,
            gpus: 0,
            cpu: String::new(),
            ..complete()
        };
        let keys = wire_keys();
        let outcome = validate(3, &record, keys.iter().map(String::as_str));
        assert!(!outcome.valid);
        assert_eq!(outcome.index, 3);
        assert_eq!(outcome.missing, ["cpu", "nb_gpu", "storage"]);
    }

    #[test]
    fn unknown_keys_are_sorted() {
        let outcome = validate(0, &complete(), ["zeta", "cpu", "alpha", "memory"]);
        assert!(!outcome.valid);
        assert!(outcome.missing.is_empty());
        assert_eq!(outcome.unexpected, ["alpha", "zeta"]);
    }

    #[test]
    fn batch_keeps_valid_records_and_counts_the_rest() {
        let mut extra_keys = wire_keys();
        extra_keys.push("extra_key".into());
        let records = vec![
            DecodedRecord {
                record: complete(),
                raw_keys: wire_keys(),
            },
            DecodedRecord {
                record: MachineRecord {
                    hash: String::new(),
                    ..complete()
                },
                raw_keys: extra_keys,
            },
            DecodedRecord {
                record: MachineRecord {
                    region: String::new(),
                    ..complete()
                },
                raw_keys: wire_keys(),
            },
        ];

        let sink = Recorder::default();
        let result = validate_batch(records, &sink);

        assert_eq!(result.machines, [complete()]);
        assert_eq!(result.total, 3);
        assert_eq!(result.valid, 1);
        assert_eq!(result.invalid, 2);
        assert_eq!(result.missing_fields, 2);
        assert_eq!(result.unexpected_fields, 1);
        assert_eq!(result.rejected[0].index, 1);
        assert_eq!(result.rejected[0].missing, ["hash"]);
        assert_eq!(result.rejected[0].unexpected, ["extra_key"]);

        let warnings = sink.0.borrow();
        assert_eq!(warnings.len(), 4);
        assert!(matches!(
            warnings.last(),
            Some(Warning::SchemaMismatch {
                invalid: 2,
                total: 3,
                ..
            })
        ));
    }

    #[test]
    fn clean_batch_emits_nothing() {
        let sink = Recorder::default();
        let result = validate_batch(
            vec![DecodedRecord {
                record: complete(),
                raw_keys: wire_keys(),
            }],
            &sink,
        );
        assert_eq!(result.invalid, 0);
        assert!(sink.0.borrow().is_empty());
    }
}
