use owlculus_core::config::AppConfig;
use owlculus_core::{
    CaseType, ClientPatch, ClientServiceError, NewCaseRequest, NewClient, Workspace,
    WorkspaceError,
};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn config_for(base: &Path) -> AppConfig {
    let mut config = AppConfig::example();
    config.paths.base_path = base.display().to_string();
    config
}

fn case_for(client: Option<&str>) -> NewCaseRequest {
    let mut request = NewCaseRequest::new(CaseType::Person);
    request.client_name = client.map(str::to_string);
    request
}

#[test]
fn open_requires_configured_paths() {
    let err = Workspace::open(&AppConfig::example()).err().unwrap();
    assert!(matches!(err, WorkspaceError::Config(_)));
}

#[test]
fn open_creates_both_database_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&dir.path().join("cases"));
    config.paths.cases_db_path = dir.path().join("db").display().to_string();
    config.paths.clients_db_path = dir.path().join("db").display().to_string();

    let workspace = Workspace::open(&config).unwrap();
    workspace.add_client(&NewClient::named("Acme Corp")).unwrap();
    drop(workspace);

    assert!(dir.path().join("db").join("cases.db").is_file());
    assert!(dir.path().join("db").join("clients.db").is_file());
    let reopened = Workspace::open(&config).unwrap();
    assert!(reopened.clients().client_exists("Acme Corp").unwrap());
}

#[test]
fn case_creation_requires_known_client() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::open_in_memory(&config_for(dir.path())).unwrap();

    let err = workspace.create_case(&case_for(Some("Nobody"))).unwrap_err();
    assert!(matches!(
        err,
        WorkspaceError::Client(ClientServiceError::ClientNotFound(_))
    ));
    assert!(workspace.cases().list_cases().unwrap().is_empty());

    workspace.add_client(&NewClient::named("Acme Corp")).unwrap();
    let case = workspace.create_case(&case_for(Some(" Acme Corp "))).unwrap();
    assert_eq!(case.client_name.as_deref(), Some("Acme Corp"));

    let blank = workspace.create_case(&case_for(Some("  "))).unwrap();
    assert_eq!(blank.client_name, None);
}

#[test]
fn client_rename_and_delete_follow_cases() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::open_in_memory(&config_for(dir.path())).unwrap();
    workspace.add_client(&NewClient::named("Acme Corp")).unwrap();
    workspace.add_client(&NewClient::named("Globex")).unwrap();
    let first = workspace.create_case(&case_for(Some("Acme Corp"))).unwrap();
    let second = workspace.create_case(&case_for(Some("Acme Corp"))).unwrap();
    workspace.create_case(&case_for(Some("Globex"))).unwrap();

    assert!(matches!(
        workspace.rename_client("Acme Corp", "Globex"),
        Err(WorkspaceError::Client(ClientServiceError::ClientExists(_)))
    ));

    workspace.rename_client("Acme Corp", "Acme Holdings").unwrap();
    let numbers: Vec<_> = workspace
        .cases_for_client("Acme Holdings")
        .unwrap()
        .into_iter()
        .map(|case| case.case_number)
        .collect();
    assert_eq!(numbers, vec![first.case_number.clone(), second.case_number]);
    assert!(workspace.cases_for_client("Acme Corp").unwrap().is_empty());

    let (removed, detached) = workspace.delete_client("Acme Holdings").unwrap();
    assert_eq!(removed.name, "Acme Holdings");
    assert_eq!(detached, 2);
    let case = workspace.cases().require_case(&first.case_number).unwrap();
    assert_eq!(case.client_name, None);
    assert_eq!(workspace.cases_for_client("Globex").unwrap().len(), 1);
}

/// File-backed workspace plus a side connection to its cases database.
fn workspace_on_disk(dir: &Path) -> (Workspace, Connection) {
    let mut config = config_for(&dir.join("cases"));
    config.paths.cases_db_path = dir.join("db").display().to_string();
    config.paths.clients_db_path = dir.join("db").display().to_string();
    let workspace = Workspace::open(&config).unwrap();
    let side = Connection::open(config.cases_db_file()).unwrap();
    (workspace, side)
}

fn block_client_updates(conn: &Connection) {
    conn.execute_batch(
        "CREATE TRIGGER block_client_refs BEFORE UPDATE OF client_name ON cases
         BEGIN SELECT RAISE(ABORT, 'client refs locked'); END;",
    )
    .unwrap();
}

#[test]
fn failed_case_update_reverts_client_rename() {
    let dir = tempfile::tempdir().unwrap();
    let (workspace, side) = workspace_on_disk(dir.path());
    workspace.add_client(&NewClient::named("Acme Corp")).unwrap();
    let case = workspace.create_case(&case_for(Some("Acme Corp"))).unwrap();
    block_client_updates(&side);

    let err = workspace.rename_client("Acme Corp", "Acme Holdings").unwrap_err();
    assert!(matches!(err, WorkspaceError::Repo(_)));

    assert!(workspace.clients().get_client_by_name("Acme Corp").unwrap().is_some());
    assert!(workspace.clients().get_client_by_name("Acme Holdings").unwrap().is_none());
    let stored = workspace.cases().require_case(&case.case_number).unwrap();
    assert_eq!(stored.client_name.as_deref(), Some("Acme Corp"));
}

#[test]
fn failed_case_detach_restores_deleted_client() {
    let dir = tempfile::tempdir().unwrap();
    let (workspace, side) = workspace_on_disk(dir.path());
    workspace
        .add_client(&NewClient {
            name: "Initech".to_string(),
            point_of_contact: "Bill".to_string(),
            phone_number: "555-0100".to_string(),
            email: "bill@initech.example".to_string(),
        })
        .unwrap();
    let case = workspace.create_case(&case_for(Some("Initech"))).unwrap();
    block_client_updates(&side);

    let err = workspace.delete_client("Initech").unwrap_err();
    assert!(matches!(err, WorkspaceError::Repo(_)));

    let restored = workspace.clients().require_client("Initech").unwrap();
    assert_eq!(restored.point_of_contact, "Bill");
    assert_eq!(restored.phone_number, "555-0100");
    assert_eq!(restored.email, "bill@initech.example");
    let stored = workspace.cases().require_case(&case.case_number).unwrap();
    assert_eq!(stored.client_name.as_deref(), Some("Initech"));
}

#[test]
fn contact_update_does_not_touch_cases() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::open_in_memory(&config_for(dir.path())).unwrap();
    workspace.add_client(&NewClient::named("Initech")).unwrap();
    workspace.create_case(&case_for(Some("Initech"))).unwrap();

    let updated = workspace
        .update_client(
            "Initech",
            &ClientPatch {
                phone_number: Some("555-0142".to_string()),
                ..ClientPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.phone_number, "555-0142");
    assert_eq!(workspace.cases_for_client("Initech").unwrap().len(), 1);
}

#[test]
fn assign_client_validates_and_detaches() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::open_in_memory(&config_for(dir.path())).unwrap();
    let case = workspace.create_case(&case_for(None)).unwrap();

    assert!(workspace
        .assign_client(&case.case_number, Some("Ghost"))
        .is_err());
    workspace.add_client(&NewClient::named("Umbrella")).unwrap();
    let assigned = workspace
        .assign_client(&case.case_number, Some("Umbrella"))
        .unwrap();
    assert_eq!(assigned.client_name.as_deref(), Some("Umbrella"));

    let detached = workspace.assign_client(&case.case_number, None).unwrap();
    assert_eq!(detached.client_name, None);
}

#[test]
fn evidence_is_scoped_to_case_folder() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::open_in_memory(&config_for(&dir.path().join("cases"))).unwrap();
    let case = workspace.create_case(&case_for(None)).unwrap();

    let source = dir.path().join("capture.txt");
    fs::write(&source, "screenshot text").unwrap();
    let entry = workspace
        .add_evidence(&case.case_number, &source, Some("Documents"))
        .unwrap();
    assert_eq!(entry.relative_path, "Documents/capture.txt");

    let listed = workspace.list_evidence(&case.case_number).unwrap();
    assert!(listed
        .iter()
        .any(|e| e.relative_path == "Documents/capture.txt"));

    workspace
        .remove_evidence(&case.case_number, "Documents/capture.txt")
        .unwrap();
    assert!(!dir
        .path()
        .join("cases")
        .join(&case.case_number)
        .join("Documents/capture.txt")
        .exists());
    assert!(matches!(
        workspace.list_evidence("0000-00"),
        Err(WorkspaceError::Case(_))
    ));
}

#[test]
fn run_tool_rejects_unknown_tools_and_missing_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::open_in_memory(&config_for(dir.path())).unwrap();
    let case = workspace.create_case(&case_for(None)).unwrap();

    assert!(matches!(
        workspace.run_tool("sherlock", &case.case_number, &BTreeMap::new()),
        Err(WorkspaceError::Tool(_))
    ));
    assert!(matches!(
        workspace.run_tool("maigret", &case.case_number, &BTreeMap::new()),
        Err(WorkspaceError::Tool(_))
    ));
    assert!(matches!(
        workspace.run_tool("maigret", "0000-00", &BTreeMap::new()),
        Err(WorkspaceError::Case(_))
    ));
}

#[cfg(unix)]
#[test]
fn run_tool_uses_case_folder_as_output() {
    use owlculus_core::config::ToolConfig;
    use owlculus_core::ToolEvent;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.tools.insert(
        "lister".to_string(),
        ToolConfig {
            path: "/bin/sh".to_string(),
            flag_args: vec!["-c".to_string(), "echo \"$1\" > \"$0/out.txt\"; echo saved".to_string()],
            positional_args: vec!["username".to_string()],
        },
    );
    let workspace = Workspace::open_in_memory(&config).unwrap();
    let case = workspace.create_case(&case_for(None)).unwrap();

    let mut args = BTreeMap::new();
    args.insert("username".to_string(), "bob".to_string());
    let handle = workspace.run_tool("Lister", &case.case_number, &args).unwrap();
    let events = handle.wait();

    assert_eq!(events.last(), Some(&ToolEvent::Completed { exit_code: Some(0) }));
    assert!(events.contains(&ToolEvent::Output("saved".to_string())));
    let written = fs::read_to_string(dir.path().join(&case.case_number).join("out.txt")).unwrap();
    assert_eq!(written.trim(), "bob");
}
