use servgraph_cli::{run_generation_sync, Command, GenerateCommand, InitCommand, ValidateCommand};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_init_then_generate() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("shop");

    InitCommand { dir: project.clone() }.execute().await.unwrap();
    let config = fs::read_to_string(project.join("servgraph.yaml")).unwrap();
    assert!(config.starts_with("# servgraph configuration for shop"));

    let report = GenerateCommand {
        project_dir: project.clone(),
        config: None,
    }
    .run()
    .await
    .unwrap();

    assert!(report.aggregates_written);
    assert_eq!(report.entities, vec!["Part".to_string(), "Widget".to_string()]);
    assert!(project.join("graphql/schema.graphql").is_file());
    assert!(project.join("src/graphql/loaders/registry.rs").is_file());
    assert!(project.join("src/graphql/resolvers/widget_resolver_impl.rs").is_file());
}

#[tokio::test]
async fn test_init_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let init = InitCommand {
        dir: temp_dir.path().to_path_buf(),
    };
    init.execute().await.unwrap();
    fs::write(temp_dir.path().join("catalog.yaml"), "classes: []\n").unwrap();

    let err = init.execute().await.unwrap_err();
    assert!(err.to_string().contains("Refusing to overwrite"));
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("catalog.yaml")).unwrap(),
        "classes: []\n"
    );
}

#[tokio::test]
async fn test_validate_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    InitCommand {
        dir: temp_dir.path().to_path_buf(),
    }
    .execute()
    .await
    .unwrap();

    let report = ValidateCommand {
        project_dir: temp_dir.path().to_path_buf(),
        config: None,
    }
    .run()
    .await
    .unwrap();

    assert_eq!(report.entities.len(), 2);
    assert!(!temp_dir.path().join("graphql").exists());
}

#[tokio::test]
async fn test_validate_reports_unknown_service() {
    let temp_dir = TempDir::new().unwrap();
    InitCommand {
        dir: temp_dir.path().to_path_buf(),
    }
    .execute()
    .await
    .unwrap();
    let config_path = temp_dir.path().join("servgraph.yaml");
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("service: PartService", "service: PartRepository");
    fs::write(&config_path, config).unwrap();

    let err = ValidateCommand {
        project_dir: temp_dir.path().to_path_buf(),
        config: Some(config_path),
    }
    .execute()
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Validation failed for 1 entities"));
}

#[tokio::test]
async fn test_generate_without_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let err = GenerateCommand {
        project_dir: temp_dir.path().to_path_buf(),
        config: None,
    }
    .execute()
    .await
    .unwrap_err();
    assert!(err.to_string().contains("No servgraph configuration"));
}

#[test]
fn test_build_script_entry() {
    let temp_dir = TempDir::new().unwrap();
    assert!(run_generation_sync(temp_dir.path()).unwrap().is_empty());
    assert!(run_generation_sync(temp_dir.path().join("missing")).is_err());

    servgraph_sdk::testing::fixtures::write_project(temp_dir.path()).unwrap();
    let results = run_generation_sync(temp_dir.path()).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].files_generated.len(), 14);
}
