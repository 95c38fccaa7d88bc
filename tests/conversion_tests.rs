//! End-to-end conversion tests

use std::fs;
use std::path::{Path, PathBuf};

use croissant_omop::convert::{
    ConversionError, ConversionOptions, Converter, FatalError, OutputFormat,
};
use croissant_omop::descriptor::Descriptor;
use croissant_omop::mapping::RequiredFieldRegistry;
use serde_json::{Value, json};
use tempfile::TempDir;

const PERSON_CSV: &str = "person_id,gender_concept_id,year_of_birth\n1,8507,1980\n2,8532,1975\n3,8507,1990\n";

fn person_field(name: &str, primary_key: bool) -> Value {
    json!({
        "@id": format!("person/{}", name),
        "name": name,
        "dataType": "sc:Integer",
        "omop:cdmField": name,
        "omop:isPrimaryKey": primary_key,
        "source": {"fileObject": {"@id": "person_csv"}}
    })
}

fn person_descriptor() -> Value {
    json!({
        "@context": "https://mlcommons.org/croissant/bio/0.2/context",
        "name": "Synthetic OMOP",
        "recordSet": [{
            "@id": "person",
            "name": "PERSON",
            "omop:cdmTable": "PERSON",
            "field": [
                person_field("person_id", true),
                person_field("gender_concept_id", false),
                person_field("year_of_birth", false)
            ]
        }],
        "distribution": [{
            "@id": "person_csv",
            "contentUrl": "person.csv",
            "encodingFormat": "text/csv"
        }]
    })
}

/// Lay out a descriptor and its data files in a temporary directory
fn dataset(descriptor: &Value, files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let metadata = dir.path().join("metadata.json");
    fs::write(&metadata, serde_json::to_string_pretty(descriptor).unwrap()).unwrap();
    (dir, metadata)
}

fn options_for(dir: &Path) -> ConversionOptions {
    ConversionOptions::new().with_base_path(dir)
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_person_csv_conversion() {
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", PERSON_CSV)]);
        let out = dir.path().join("out");

        let result = Converter::new()
            .convert(&metadata, &out, &options_for(dir.path()))
            .unwrap();

        assert!(result.success);
        assert_eq!(result.tables_converted, 1);
        assert_eq!(result.tables["PERSON"].rows, 3);
        assert_eq!(result.tables["PERSON"].columns, 3);
        assert!(out.join("PERSON.csv").exists());
        assert!(!out.join("PERSON_ddl.sql").exists());

        let csv = fs::read_to_string(out.join("PERSON.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert_eq!(csv.lines().next(), Some("person_id,gender_concept_id,year_of_birth"));
    }

    #[test]
    fn test_duplicate_person_id_reported() {
        let csv = "person_id,gender_concept_id,year_of_birth\n1,8507,1980\n1,8532,1975\n3,8507,1990\n";
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", csv)]);

        let result = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options_for(dir.path()))
            .unwrap();

        let validation = &result.validation_results["PERSON"];
        assert!(!validation.valid);
        assert!(validation.errors.iter().any(|e| e.contains("duplicate")));
        // Validation failures are reported but do not fail the run
        assert!(result.success);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.starts_with("Validation failed for PERSON"))
        );
    }

    #[test]
    fn test_no_validate_skips_validation() {
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", PERSON_CSV)]);
        let options = options_for(dir.path()).with_validate(false);

        let result = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options)
            .unwrap();
        assert!(result.validation_results.is_empty());
        assert_eq!(result.tables_converted, 1);
    }

    #[test]
    fn test_sql_and_csv_outputs() {
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", PERSON_CSV)]);
        let out = dir.path().join("out");
        let options = options_for(dir.path()).with_output_format(OutputFormat::Both);

        let result = Converter::new().convert(&metadata, &out, &options).unwrap();
        assert_eq!(result.tables["PERSON"].outputs.len(), 3);

        let ddl = fs::read_to_string(out.join("PERSON_ddl.sql")).unwrap();
        assert!(ddl.starts_with("CREATE TABLE PERSON ("));
        assert!(ddl.contains("  person_id INTEGER NOT NULL"));
        assert!(ddl.contains("PRIMARY KEY (person_id)"));

        let data = fs::read_to_string(out.join("PERSON_data.sql")).unwrap();
        assert_eq!(
            data,
            "INSERT INTO PERSON (person_id, gender_concept_id, year_of_birth) VALUES\n  (1, 8507, 1980),\n  (2, 8532, 1975),\n  (3, 8507, 1990);"
        );
    }

    #[test]
    fn test_batches_separated_by_blank_line() {
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", PERSON_CSV)]);
        let out = dir.path().join("out");
        let options = options_for(dir.path())
            .with_output_format(OutputFormat::Sql)
            .with_batch_size(2);

        Converter::new().convert(&metadata, &out, &options).unwrap();
        let data = fs::read_to_string(out.join("PERSON_data.sql")).unwrap();
        assert_eq!(data.split("\n\n").count(), 2);
        assert!(!out.join("PERSON.csv").exists());
    }
}

mod property_tests {
    use super::*;

    fn multi_table_descriptor(tables: &[&str]) -> Value {
        let record_sets: Vec<Value> = tables
            .iter()
            .map(|t| {
                json!({
                    "name": t,
                    "field": [{
                        "name": "id",
                        "source": {"fileObject": {"@id": format!("{}_csv", t)}}
                    }]
                })
            })
            .collect();
        let distributions: Vec<Value> = tables
            .iter()
            .map(|t| {
                json!({
                    "@id": format!("{}_csv", t),
                    "contentUrl": format!("{}.csv", t),
                    "encodingFormat": "text/csv"
                })
            })
            .collect();
        json!({"recordSet": record_sets, "distribution": distributions})
    }

    #[test]
    fn test_n_record_sets_produce_n_tables() {
        let tables = ["NOTE", "SPECIMEN", "LOCATION", "CARE_SITE"];
        let dir = TempDir::new().unwrap();
        for t in &tables {
            fs::write(dir.path().join(format!("{}.csv", t)), "id\n1\n2\n").unwrap();
        }
        let metadata = dir.path().join("metadata.json");
        fs::write(&metadata, multi_table_descriptor(&tables).to_string()).unwrap();
        let out = dir.path().join("out");

        let result = Converter::new()
            .convert(&metadata, &out, &options_for(dir.path()))
            .unwrap();

        assert!(result.success);
        assert_eq!(result.tables_converted, tables.len());
        for t in &tables {
            assert!(out.join(format!("{}.csv", t)).exists());
        }
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let csv = "person_id,gender_concept_id,year_of_birth,weight\n1,8507,1980,70\n2,8532,,71.5\n3,8507,1990,\n";
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", csv)]);
        let out = dir.path().join("out");
        let options = options_for(dir.path());

        Converter::new().convert(&metadata, &out, &options).unwrap();
        let first = fs::read(out.join("PERSON.csv")).unwrap();
        Converter::new().convert(&metadata, &out, &options).unwrap();
        let second = fs::read(out.join("PERSON.csv")).unwrap();

        assert_eq!(first, second);
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_malformed_descriptor_is_fatal() {
        let dir = TempDir::new().unwrap();
        let metadata = dir.path().join("metadata.json");
        fs::write(&metadata, r#"{"recordSet": []}"#).unwrap();

        let err = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &ConversionOptions::new())
            .unwrap_err();
        assert!(matches!(err, FatalError::Descriptor(_)));
    }

    #[test]
    fn test_invalid_options_are_fatal() {
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", PERSON_CSV)]);
        let options = options_for(dir.path()).with_batch_size(0);
        let err = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options)
            .unwrap_err();
        assert!(matches!(err, FatalError::Config(_)));
    }

    #[test]
    fn test_failing_table_does_not_stop_the_run() {
        let mut descriptor = person_descriptor();
        descriptor["recordSet"].as_array_mut().unwrap().push(json!({
            "name": "DEATH",
            "field": [{"name": "person_id", "source": {"fileObject": {"@id": "death_csv"}}}]
        }));
        descriptor["recordSet"].as_array_mut().unwrap().push(json!({
            "name": "NOTE",
            "field": []
        }));
        let (dir, metadata) = dataset(&descriptor, &[("person.csv", PERSON_CSV)]);

        let result = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options_for(dir.path()))
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.tables_converted, 1);
        assert_eq!(result.failures["DEATH"], "Distribution death_csv not found");
        assert_eq!(result.failures["NOTE"], "RecordSet NOTE has no fields");
        assert!(
            result
                .errors
                .contains(&"Error processing DEATH: Distribution death_csv not found".to_string())
        );
    }

    #[test]
    fn test_missing_reference_and_location() {
        let descriptor = json!({
            "recordSet": [
                {"name": "NOTE", "field": [{"name": "note_id"}]},
                {"name": "SPECIMEN", "field": [{"name": "specimen_id", "source": {"fileObject": {"@id": "specimen_csv"}}}]},
                {"name": "LOCATION", "field": [{"name": "location_id", "source": {"fileObject": {"@id": "location_json"}}}]}
            ],
            "distribution": [
                {"@id": "specimen_csv", "encodingFormat": "text/csv"},
                {"@id": "location_json", "contentUrl": "location.json", "encodingFormat": "application/json"}
            ]
        });
        let (dir, metadata) = dataset(&descriptor, &[]);

        let result = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options_for(dir.path()))
            .unwrap();

        assert_eq!(result.tables_converted, 0);
        assert_eq!(result.failures["NOTE"], "No distribution reference found for NOTE");
        assert_eq!(
            result.failures["SPECIMEN"],
            "Distribution missing contentUrl: specimen_csv"
        );
        assert_eq!(
            result.failures["LOCATION"],
            "Unsupported encoding format: application/json"
        );
    }

    #[test]
    fn test_unsafe_table_name_rejected() {
        let mut descriptor = person_descriptor();
        descriptor["recordSet"][0]["omop:cdmTable"] = json!("../PERSON");
        let (dir, metadata) = dataset(&descriptor, &[("person.csv", PERSON_CSV)]);
        let out = dir.path().join("out");

        let result = Converter::new()
            .convert(&metadata, &out, &options_for(dir.path()))
            .unwrap();

        assert!(!result.success);
        assert!(result.failures["../PERSON"].starts_with("Invalid table name"));
        assert!(!dir.path().join("PERSON.csv").exists());
    }

    #[test]
    fn test_metadata_defects_stay_with_their_table() {
        let mut descriptor = person_descriptor();
        descriptor["recordSet"][0]["field"][0]["omop:isPrimaryKey"] = json!("true");
        descriptor["recordSet"].as_array_mut().unwrap().push(json!({
            "name": "NOTE",
            "field": [
                {"name": "note_id", "source": {"fileObject": {"@id": "note_csv"}}},
                {"dataType": "sc:Text"}
            ]
        }));
        descriptor["recordSet"].as_array_mut().unwrap().push(json!({
            "name": "SPECIMEN",
            "field": [{"name": "specimen_id", "source": {"fileObject": {"@id": "specimen_csv"}}}]
        }));
        descriptor["distribution"].as_array_mut().unwrap().push(json!({
            "@id": "note_csv",
            "contentUrl": "note.csv"
        }));
        // Would have served SPECIMEN, but cannot be referenced without an @id
        descriptor["distribution"].as_array_mut().unwrap().push(json!({
            "contentUrl": "specimen.csv",
            "encodingFormat": "text/csv"
        }));
        let (dir, metadata) = dataset(
            &descriptor,
            &[
                ("person.csv", PERSON_CSV),
                ("note.csv", "note_id\n1\n"),
                ("specimen.csv", "specimen_id\n1\n"),
            ],
        );
        let out = dir.path().join("out");
        let options = options_for(dir.path()).with_output_format(OutputFormat::Both);

        let result = Converter::new().convert(&metadata, &out, &options).unwrap();

        assert!(!result.success);
        assert_eq!(result.tables_converted, 1);
        assert_eq!(result.tables["PERSON"].rows, 3);
        assert_eq!(result.failures["NOTE"], "Field 2 of NOTE has no name");
        assert_eq!(result.failures["SPECIMEN"], "Distribution specimen_csv not found");
        let ddl = fs::read_to_string(out.join("PERSON_ddl.sql")).unwrap();
        assert!(ddl.contains("PRIMARY KEY (person_id)"));
    }

    #[test]
    fn test_unsafe_column_name_rejected_for_sql() {
        let mut descriptor = person_descriptor();
        descriptor["recordSet"][0]["field"][2]["omop:cdmField"] =
            json!("id INTEGER); DROP TABLE PERSON; --");
        let (dir, metadata) = dataset(&descriptor, &[("person.csv", PERSON_CSV)]);
        let out = dir.path().join("out");

        let options = options_for(dir.path()).with_output_format(OutputFormat::Sql);
        let result = Converter::new().convert(&metadata, &out, &options).unwrap();

        assert_eq!(result.tables_converted, 0);
        assert!(
            result.failures["PERSON"]
                .starts_with("Invalid column name 'id INTEGER); DROP TABLE PERSON; --' in PERSON")
        );
        assert!(!out.join("PERSON_ddl.sql").exists());
        assert!(!out.join("PERSON_data.sql").exists());
    }

    #[test]
    fn test_unsafe_csv_header_rejected_for_sql() {
        let csv = "person_id,gender_concept_id,year_of_birth,\"x); DELETE FROM PERSON; --\"\n1,8507,1980,a\n";
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", csv)]);
        let out = dir.path().join("out");

        let sql = options_for(dir.path()).with_output_format(OutputFormat::Both);
        let result = Converter::new().convert(&metadata, &out, &sql).unwrap();
        assert!(result.failures["PERSON"].starts_with("Invalid column name 'x); DELETE FROM PERSON; --'"));
        assert!(!out.join("PERSON.csv").exists());

        // CSV output carries the header as data and needs no check
        let result = Converter::new()
            .convert(&metadata, &out, &options_for(dir.path()))
            .unwrap();
        assert_eq!(result.tables_converted, 1);
    }

    #[test]
    fn test_hyphenated_table_name_rejected() {
        let mut descriptor = person_descriptor();
        descriptor["recordSet"][0]["omop:cdmTable"] = json!("drug-exposure");
        let (dir, metadata) = dataset(&descriptor, &[("person.csv", PERSON_CSV)]);

        let result = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options_for(dir.path()))
            .unwrap();
        assert!(result.failures["drug-exposure"].starts_with("Invalid table name 'drug-exposure'"));
    }

    #[test]
    fn test_error_kinds_distinguish_retryable_failures() {
        let (dir, metadata) = dataset(&person_descriptor(), &[]);
        let descriptor = Descriptor::from_path(&metadata).unwrap();
        let result = Converter::new()
            .convert_descriptor(&descriptor, &dir.path().join("out"), &options_for(dir.path()))
            .unwrap();
        assert!(result.failures["PERSON"].contains("person.csv"));

        let err = ConversionError::NoFields {
            table: "PERSON".into(),
        };
        assert!(!err.is_recoverable());
    }
}

mod mapping_tests {
    use super::*;

    #[test]
    fn test_columns_renamed_to_target_fields() {
        let descriptor = json!({
            "recordSet": [{
                "name": "patients",
                "omop:cdmTable": "PERSON",
                "field": [
                    {"name": "pid", "omop:cdmField": "person_id", "omop:isPrimaryKey": true,
                     "source": {"fileObject": {"@id": "patients_csv"}}},
                    {"name": "sex", "omop:cdmField": "gender_concept_id"}
                ]
            }],
            "distribution": [{"@id": "patients_csv", "contentUrl": "patients.csv"}]
        });
        let (dir, metadata) = dataset(&descriptor, &[("patients.csv", "pid,sex\n1,8507\n2,8532\n")]);
        let out = dir.path().join("out");

        let result = Converter::new()
            .convert(&metadata, &out, &options_for(dir.path()))
            .unwrap();

        let csv = fs::read_to_string(out.join("PERSON.csv")).unwrap();
        assert!(csv.starts_with("person_id,gender_concept_id\n"));
        let validation = &result.validation_results["PERSON"];
        assert_eq!(validation.errors.len(), 1);
        assert!(validation.errors[0].starts_with("Missing required fields: year_of_birth"));
    }

    #[test]
    fn test_custom_registry() {
        let registry = RequiredFieldRegistry::empty();
        let csv = "person_id\n1\n1\n";
        let (dir, metadata) = dataset(&person_descriptor(), &[("person.csv", csv)]);

        let result = Converter::with_registry(registry)
            .convert(&metadata, &dir.path().join("out"), &options_for(dir.path()))
            .unwrap();
        // PERSON is unknown to an empty registry and therefore valid
        assert!(result.validation_results["PERSON"].valid);
    }
}

mod reference_tests {
    use super::*;

    fn descriptor_with_conditions() -> Value {
        let mut descriptor = person_descriptor();
        descriptor["recordSet"].as_array_mut().unwrap().push(json!({
            "name": "CONDITION_OCCURRENCE",
            "field": [
                {"name": "condition_occurrence_id", "omop:isPrimaryKey": true,
                 "source": {"fileObject": {"@id": "condition_csv"}}},
                {"name": "person_id", "omop:foreignKeyTable": "PERSON",
                 "references": {"@id": "person/person_id"}},
                {"name": "visit_occurrence_id", "omop:foreignKeyTable": "VISIT_OCCURRENCE"}
            ]
        }));
        descriptor["distribution"].as_array_mut().unwrap().push(json!({
            "@id": "condition_csv",
            "contentUrl": "condition.csv",
            "encodingFormat": "text/csv"
        }));
        descriptor
    }

    const CONDITIONS: &str = "condition_occurrence_id,person_id,visit_occurrence_id\n10,1,5\n11,4,5\n12,9,\n";

    #[test]
    fn test_reference_checks_are_opt_in() {
        let (dir, metadata) = dataset(
            &descriptor_with_conditions(),
            &[("person.csv", PERSON_CSV), ("condition.csv", CONDITIONS)],
        );
        let result = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options_for(dir.path()))
            .unwrap();
        assert!(result.reference_results.is_empty());
    }

    #[test]
    fn test_orphaned_references_reported() {
        let (dir, metadata) = dataset(
            &descriptor_with_conditions(),
            &[("person.csv", PERSON_CSV), ("condition.csv", CONDITIONS)],
        );
        let options = options_for(dir.path()).with_check_references(true);
        let result = Converter::new()
            .convert(&metadata, &dir.path().join("out"), &options)
            .unwrap();

        // VISIT_OCCURRENCE was not converted, so only the PERSON reference is checked
        assert_eq!(result.reference_results.len(), 1);
        let check = &result.reference_results["CONDITION_OCCURRENCE.person_id -> PERSON"];
        assert!(!check.valid);
        assert_eq!(
            check.errors,
            vec!["Foreign key 'person_id' has 2 orphaned references".to_string()]
        );
        assert!(result.success);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.starts_with("Reference check failed for CONDITION_OCCURRENCE.person_id"))
        );
    }
}
