use propertyloop::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;

// Clear environment variables that would leak between tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("PROPERTYLOOP_SERVER__PORT");
        env::remove_var("PROPERTYLOOP_WIDGET__ENDPOINT");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["propertyloop"]).expect("Failed to load config");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.assistant.port, 5000);
    assert_eq!(config.assistant.top_k, 3);
    assert_eq!(config.widget.endpoint, "http://localhost:5000/chat");
    assert!(config.assistant.knowledge_path.is_none());
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("PROPERTYLOOP_SERVER__PORT", "9090");
        env::set_var("PROPERTYLOOP_WIDGET__ENDPOINT", "http://assistant:5000/chat");
    }

    let config = AppConfig::load_from_args(["propertyloop"]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.widget.endpoint, "http://assistant:5000/chat");

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let config_content = r#"
server:
  port: 7070
assistant:
  knowledge_path: ./knowledge
  chunk_size: 800
    "#;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = dir.path().join("propertyloop.yaml");
    fs::write(&file_path, config_content).expect("Failed to write temp config");

    // CONFIG_FILE backs the --config flag
    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = AppConfig::load_from_args(["propertyloop"]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.assistant.knowledge_path.as_deref(), Some("./knowledge"));
    assert_eq!(config.assistant.chunk_size, 800);
    assert_eq!(config.assistant.chunk_overlap, 50);

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_config_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["propertyloop", "--config", "/no/such/propertyloop.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let config_content = r#"
server:
  port: 6060
    "#;
    let cwd_path = "config.yaml";
    fs::write(cwd_path, config_content).expect("Failed to write ./config.yaml");

    let config = AppConfig::load_from_args(["propertyloop"]);

    fs::remove_file(cwd_path).unwrap();

    assert_eq!(config.expect("Failed to load config").server.port, 6060);
}

#[test]
#[serial]
fn test_port_flag_targets_selected_server() {
    clear_env_vars();

    let site = AppConfig::load_from_args(["propertyloop", "--port", "8080"]).unwrap();
    assert_eq!(site.server.port, 8080);
    assert_eq!(site.assistant.port, 5000);

    let assistant =
        AppConfig::load_from_args(["propertyloop", "assistant", "--port", "8081"]).unwrap();
    assert_eq!(assistant.server.port, 3000);
    assert_eq!(assistant.assistant.port, 8081);
}

#[test]
#[serial]
fn test_port_flag_beats_environment() {
    clear_env_vars();
    unsafe {
        env::set_var("PROPERTYLOOP_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args(["propertyloop", "--port", "8080"]).unwrap();
    assert_eq!(config.server.port, 8080);

    clear_env_vars();
}
