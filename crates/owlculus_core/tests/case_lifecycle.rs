use chrono::{NaiveDate, NaiveDateTime};
use owlculus_core::db::{open_db_in_memory, Schema};
use owlculus_core::layout::TemplateSource;
use owlculus_core::repo::case_repo::{CaseInsert, CaseRepository, SqliteCaseRepository};
use owlculus_core::{CaseService, CaseServiceError, CaseType, NewCaseRequest};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn service<'a>(conn: &'a Connection, base: &Path) -> CaseService<SqliteCaseRepository<'a>> {
    CaseService::new(SqliteCaseRepository::new(conn), base, TemplateSource::BuiltIn)
}

#[test]
fn case_numbers_fill_the_first_gap_of_the_month() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let request = NewCaseRequest::new(CaseType::Person);

    let numbers: Vec<String> = (0..3)
        .map(|_| cases.create_case_at(&request, at(2024, 5, 10)).unwrap().case_number)
        .collect();
    assert_eq!(numbers, vec!["2405-01", "2405-02", "2405-03"]);

    cases.delete_case("2405-02").unwrap();
    assert_eq!(
        cases.next_case_number(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()).unwrap(),
        "2405-02"
    );

    // Other months do not share the sequence.
    let june = cases.create_case_at(&request, at(2024, 6, 1)).unwrap();
    assert_eq!(june.case_number, "2406-01");
}

#[test]
fn case_numbers_run_out_after_ninety_nine() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteCaseRepository::new(&conn);
    for sequence in 1..=99 {
        let number = format!("2405-{sequence:02}");
        repo.insert_case(&CaseInsert {
            case_number: number.clone(),
            case_type: CaseType::Event,
            client_name: None,
            folder_name: number,
            created_at: at(2024, 5, 1),
        })
        .unwrap();
    }

    let cases = service(&conn, dir.path());
    let err = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Event), at(2024, 5, 20))
        .unwrap_err();
    match err {
        CaseServiceError::CaseNumbersExhausted(prefix) => assert_eq!(prefix, "2405"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn company_case_is_scaffolded_with_templates() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());

    let case = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Company), at(2024, 5, 17))
        .unwrap();
    let root = dir.path().join(&case.case_number);

    for folder in ["Associates", "Audio", "Documents", "Other", "Domains", "Executives", "Network"] {
        assert!(root.join(folder).is_dir(), "missing {folder}");
    }
    for platform in ["Reddit", "Telegram", "YouTube"] {
        assert!(root.join("Social_Media").join(platform).is_dir());
    }

    let notes = fs::read_to_string(root.join("Notes.md")).unwrap();
    assert!(notes.contains("**Case Number:** 2405-01"));
    assert!(notes.contains("**Case Type:** Company"));
    assert!(notes.contains("**Date:** 2024-05-17"));
    assert!(root.join("Social_Media").join("SOCMINT.md").is_file());
    assert!(root.join("Associates").join("Associates.md").is_file());
    assert_eq!(case.created_at, at(2024, 5, 17));
}

#[test]
fn person_case_has_no_company_folders() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());

    let case = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Person), at(2024, 5, 17))
        .unwrap();
    let root = dir.path().join(&case.case_number);
    assert!(root.join("Documents").is_dir());
    assert!(!root.join("Domains").exists());
}

#[test]
fn custom_template_directory_is_used() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let templates = tempfile::tempdir().unwrap();
    fs::write(templates.path().join("Notes.md"), "**Case Number:**\n").unwrap();
    fs::write(templates.path().join("Checklist.md"), "- [ ] whois\n").unwrap();
    fs::write(templates.path().join("ignored.txt"), "nope").unwrap();

    let cases = CaseService::new(
        SqliteCaseRepository::new(&conn),
        dir.path(),
        TemplateSource::Directory(templates.path().to_path_buf()),
    );
    let case = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Event), at(2024, 7, 2))
        .unwrap();
    let root = dir.path().join(&case.case_number);

    assert_eq!(
        fs::read_to_string(root.join("Notes.md")).unwrap(),
        "**Case Number:** 2407-01\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("Checklist.md")).unwrap(),
        "- [ ] whois\n"
    );
    assert!(!root.join("ignored.txt").exists());
    assert!(!root.join("Social_Media").join("SOCMINT.md").exists());
}

#[test]
fn existing_folder_blocks_creation_without_inserting_row() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("2405-01")).unwrap();
    fs::write(dir.path().join("2405-01").join("keep.txt"), "x").unwrap();
    let cases = service(&conn, dir.path());

    let err = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Person), at(2024, 5, 3))
        .unwrap_err();
    assert!(matches!(err, CaseServiceError::FolderExists(_)));
    assert!(cases.list_cases().unwrap().is_empty());
    assert!(dir.path().join("2405-01").join("keep.txt").is_file());
}

#[test]
fn rename_to_existing_number_changes_nothing() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let request = NewCaseRequest::new(CaseType::Person);
    cases.create_case_at(&request, at(2024, 5, 1)).unwrap();
    cases.create_case_at(&request, at(2024, 5, 2)).unwrap();

    let err = cases.rename_case("2405-01", "2405-02").unwrap_err();
    match err {
        CaseServiceError::CaseNumberExists(number) => assert_eq!(number, "2405-02"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        cases.rename_case("2405-01", "2405-02").unwrap_err().to_string(),
        "Case number 2405-02 already exists."
    );

    assert!(cases.get_case("2405-01").unwrap().is_some());
    assert!(dir.path().join("2405-01").join("Notes.md").is_file());
    assert!(dir.path().join("2405-02").join("Notes.md").is_file());
    assert_eq!(cases.list_case_numbers().unwrap(), vec!["2405-01", "2405-02"]);
}

#[test]
fn rename_moves_row_and_folder() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    cases
        .create_case_at(&NewCaseRequest::new(CaseType::ThreatIntel), at(2024, 5, 1))
        .unwrap();

    let renamed = cases.rename_case("2405-01", " APT-Phish ").unwrap();
    assert_eq!(renamed.case_number, "APT-Phish");
    assert_eq!(renamed.folder_name, "APT-Phish");
    assert!(cases.get_case("2405-01").unwrap().is_none());
    assert!(!dir.path().join("2405-01").exists());
    assert!(dir.path().join("APT-Phish").join("Notes.md").is_file());

    // The freed number is handed out again.
    let next = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Person), at(2024, 5, 9))
        .unwrap();
    assert_eq!(next.case_number, "2405-01");
}

#[test]
fn custom_named_case_keeps_its_folder_on_rename() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let mut request = NewCaseRequest::new(CaseType::Person);
    request.case_name = Some("Operation Owl".to_string());

    let case = cases.create_case_at(&request, at(2024, 5, 1)).unwrap();
    assert_eq!(case.case_number, "2405-01");
    assert_eq!(case.folder_name, "Operation Owl");
    assert!(dir.path().join("Operation Owl").join("Notes.md").is_file());

    let renamed = cases.rename_case("2405-01", "2405-77").unwrap();
    assert_eq!(renamed.folder_name, "Operation Owl");
    assert_eq!(
        cases.case_folder("2405-77").unwrap(),
        dir.path().join("Operation Owl")
    );
}

#[test]
fn invalid_rename_targets_are_rejected() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    cases
        .create_case_at(&NewCaseRequest::new(CaseType::Person), at(2024, 5, 1))
        .unwrap();

    assert!(matches!(
        cases.rename_case("2405-01", "   "),
        Err(CaseServiceError::Validation(_))
    ));
    assert!(matches!(
        cases.rename_case("2405-01", "../escape"),
        Err(CaseServiceError::Validation(_))
    ));
    assert!(matches!(
        cases.rename_case("2405-09", "2405-10"),
        Err(CaseServiceError::CaseNotFound(_))
    ));
}

#[test]
fn delete_removes_row_and_directory_tree() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    cases
        .create_case_at(&NewCaseRequest::new(CaseType::Company), at(2024, 5, 1))
        .unwrap();
    fs::write(
        dir.path().join("2405-01").join("Documents").join("report.pdf"),
        b"%PDF",
    )
    .unwrap();

    cases.delete_case("2405-01").unwrap();
    assert!(cases.get_case("2405-01").unwrap().is_none());
    assert!(!dir.path().join("2405-01").exists());
    assert!(matches!(
        cases.delete_case("2405-01"),
        Err(CaseServiceError::CaseNotFound(_))
    ));
}

#[test]
fn search_matches_any_visible_column() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let mut request = NewCaseRequest::new(CaseType::ThreatIntel);
    request.client_name = Some("Acme Corp".to_string());
    cases.create_case_at(&request, at(2024, 5, 1)).unwrap();
    cases
        .create_case_at(&NewCaseRequest::new(CaseType::Person), at(2024, 5, 2))
        .unwrap();

    let by_client: Vec<_> = cases
        .search_cases("acme")
        .unwrap()
        .into_iter()
        .map(|case| case.case_number)
        .collect();
    assert_eq!(by_client, vec!["2405-01"]);
    assert_eq!(cases.search_cases("threat").unwrap().len(), 1);
    assert_eq!(cases.search_cases("2024-05-02").unwrap().len(), 1);
    assert_eq!(cases.search_cases("").unwrap().len(), 2);
}

#[test]
fn case_serializes_with_display_type_and_timestamp() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let case = cases
        .create_case_at(&NewCaseRequest::new(CaseType::ThreatIntel), at(2024, 5, 17))
        .unwrap();

    let json = serde_json::to_value(&case).unwrap();
    assert_eq!(json["case_type"], "Threat Intel");
    assert_eq!(json["created_at"], "2024-05-17 09:30:00");
    assert_eq!(json["client_name"], serde_json::Value::Null);
}

#[test]
fn case_name_shaped_like_a_number_is_rejected() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let mut request = NewCaseRequest::new(CaseType::Person);
    request.case_name = Some("2405-02".to_string());

    assert!(matches!(
        cases.create_case_at(&request, at(2024, 5, 1)),
        Err(CaseServiceError::Validation(_))
    ));
    assert!(!dir.path().join("2405-02").exists());

    // Allocation keeps moving through the month.
    let plain = NewCaseRequest::new(CaseType::Person);
    for expected in ["2405-01", "2405-02", "2405-03"] {
        let case = cases.create_case_at(&plain, at(2024, 5, 2)).unwrap();
        assert_eq!(case.case_number, expected);
    }
}

#[test]
fn scaffold_failure_removes_inserted_row() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("not-a-dir");
    fs::write(&base, "occupied").unwrap();
    let cases = service(&conn, &base);

    let err = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Company), at(2024, 5, 1))
        .unwrap_err();
    assert!(matches!(err, CaseServiceError::Layout(_)));
    assert!(cases.list_cases().unwrap().is_empty());
    assert_eq!(fs::read_to_string(&base).unwrap(), "occupied");
}

#[cfg(unix)]
#[test]
fn folder_move_failure_restores_case_number() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let created = cases
        .create_case_at(&NewCaseRequest::new(CaseType::Person), at(2024, 5, 1))
        .unwrap();

    // Longer than any file system allows for one path component.
    let too_long = "x".repeat(300);
    let err = cases.rename_case("2405-01", &too_long).unwrap_err();
    assert!(matches!(err, CaseServiceError::Io { .. }));

    let restored = cases.get_case("2405-01").unwrap().unwrap();
    assert_eq!(restored.folder_name, created.folder_name);
    assert!(cases.get_case(&too_long).unwrap().is_none());
    assert!(dir.path().join("2405-01").join("Notes.md").is_file());
}

#[cfg(unix)]
#[test]
fn tree_removal_failure_restores_row() {
    let conn = open_db_in_memory(Schema::Cases).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cases = service(&conn, dir.path());
    let mut request = NewCaseRequest::new(CaseType::Event);
    request.case_name = Some("Harbor Watch".to_string());
    request.client_name = Some("Acme Corp".to_string());
    let created = cases.create_case_at(&request, at(2024, 5, 1)).unwrap();

    // A plain file where the case folder should be cannot be removed as a tree.
    let root = dir.path().join("Harbor Watch");
    fs::remove_dir_all(&root).unwrap();
    fs::write(&root, "placeholder").unwrap();

    let err = cases.delete_case("2405-01").unwrap_err();
    assert!(matches!(err, CaseServiceError::Io { .. }));

    let restored = cases.get_case("2405-01").unwrap().unwrap();
    assert_eq!(restored.case_type, created.case_type);
    assert_eq!(restored.client_name, created.client_name);
    assert_eq!(restored.folder_name, created.folder_name);
    assert_eq!(restored.created_at, created.created_at);
    assert!(root.is_file());
}
