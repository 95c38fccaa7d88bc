//! Export format tests

use std::fs;

use croissant_omop::descriptor::ScalarType;
use croissant_omop::export::{CsvExporter, SqlDialect, SqlExporter};
use croissant_omop::extract::{CellValue, Column, ExtractedTable};
use croissant_omop::mapping::{FieldMapping, TableMapping};
use tempfile::TempDir;

fn person_mapping() -> TableMapping {
    TableMapping {
        target_table: Some("PERSON".to_string()),
        record_set_id: Some("person".to_string()),
        description: None,
        field_mappings: vec![
            FieldMapping::new("person_id")
                .with_data_type(ScalarType::Integer)
                .with_primary_key(true),
            FieldMapping::new("birth_datetime").with_data_type(ScalarType::DateTime),
            FieldMapping::new("src_gender")
                .with_target("gender_source_value")
                .with_data_type(ScalarType::Text),
        ],
        primary_key: Some("person_id".to_string()),
        foreign_keys: Vec::new(),
    }
}

fn person_rows(count: i64) -> ExtractedTable {
    ExtractedTable::from_columns(vec![
        Column::new("person_id", (1..=count).map(CellValue::from).collect()),
        Column::new(
            "gender_source_value",
            (1..=count)
                .map(|i| CellValue::from(if i % 2 == 0 { "F" } else { "M" }))
                .collect(),
        ),
    ])
    .unwrap()
}

mod ddl_tests {
    use super::*;

    #[test]
    fn test_single_primary_key() {
        let schema = SqlExporter::table_schema(&person_mapping(), &person_rows(2));
        let ddl = SqlExporter::default().generate_ddl(&schema);

        assert_eq!(
            ddl,
            "CREATE TABLE PERSON (\n  person_id INTEGER NOT NULL,\n  birth_datetime TIMESTAMP,\n  gender_source_value VARCHAR(255),\n  PRIMARY KEY (person_id)\n);"
        );
        assert_eq!(ddl.matches("PRIMARY KEY").count(), 1);
    }

    #[test]
    fn test_dialect_does_not_change_output() {
        let schema = SqlExporter::table_schema(&person_mapping(), &person_rows(3));
        let table = person_rows(3);
        let baseline = SqlExporter::new(SqlDialect::PostgreSql);

        for dialect in [SqlDialect::MySql, SqlDialect::Sqlite] {
            let exporter = SqlExporter::new(dialect);
            assert_eq!(exporter.generate_ddl(&schema), baseline.generate_ddl(&schema));
            assert_eq!(
                exporter.generate_insert_statements("PERSON", &table),
                baseline.generate_insert_statements("PERSON", &table)
            );
        }
    }

    #[test]
    fn test_write_ddl_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PERSON_ddl.sql");
        let schema = SqlExporter::table_schema(&person_mapping(), &person_rows(1));

        SqlExporter::default().write_ddl(&path, &schema).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("CREATE TABLE PERSON ("));
    }
}

mod insert_tests {
    use super::*;

    #[test]
    fn test_statement_count_follows_batch_size() {
        let table = person_rows(250);
        for (batch_size, expected) in [(100, 3), (250, 1), (1, 250), (1000, 1)] {
            let statements = SqlExporter::default()
                .with_batch_size(batch_size)
                .generate_insert_statements("PERSON", &table);
            assert_eq!(statements.len(), expected, "batch size {}", batch_size);
        }
    }

    #[test]
    fn test_statement_layout_and_quoting() {
        let table = ExtractedTable::from_columns(vec![
            Column::new("person_id", vec![CellValue::from(1i64), CellValue::from(2i64)]),
            Column::new(
                "person_source_value",
                vec![CellValue::from("O'Brien"), CellValue::Null],
            ),
        ])
        .unwrap();

        let statements = SqlExporter::default().generate_insert_statements("PERSON", &table);
        assert_eq!(
            statements,
            vec![
                "INSERT INTO PERSON (person_id, person_source_value) VALUES\n  (1, 'O''Brien'),\n  (2, NULL);"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_empty_table_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PERSON_data.sql");
        let table = ExtractedTable::from_columns(vec![Column::new("person_id", Vec::new())]).unwrap();

        SqlExporter::default()
            .write_inserts(&path, "PERSON", &table)
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}

mod csv_tests {
    use super::*;

    #[test]
    fn test_export_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PERSON.csv");
        let table = ExtractedTable::from_columns(vec![
            Column::new("person_id", vec![CellValue::from(1i64), CellValue::from(2i64)]),
            Column::new("weight", vec![CellValue::from(70.0), CellValue::Null]),
            Column::new("note", vec![CellValue::from("a,b"), CellValue::from("plain")]),
        ])
        .unwrap();

        CsvExporter.export(&table, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "person_id,weight,note\n1,70.0,\"a,b\"\n2,,plain\n"
        );
    }

    #[test]
    fn test_export_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PERSON.csv");
        fs::write(&path, "stale content that is longer than the new output\n").unwrap();

        CsvExporter.export(&person_rows(1), &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "person_id,gender_source_value\n1,M\n"
        );
    }
}
