use serial_test::serial;
use std::env;
use std::fs;
use universe_explorer::config::AppConfig;
use universe_explorer::widget::UnsupportedSpeechPolicy;

const BIN: &str = "universe-explorer";

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("UNIVERSE_SERVER__PORT");
        env::remove_var("UNIVERSE_WIDGET__UNSUPPORTED_SPEECH");
        env::remove_var("UNIVERSE_WIDGET__SESSION_TIMEOUT_SECS");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("TIMEOUT_DISABLED");
        env::remove_var("CHAT_API_KEY");
        env::remove_var("CHAT_BASE_URL");
        env::remove_var("UNSPLASH_ACCESS_KEY");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load defaults");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.chat.base_url, "https://apis.contenaissance.com");
    assert_eq!(config.gallery.query, "universe galaxy space");
    assert_eq!(config.widget.mobile_breakpoint, 786);
    assert_eq!(config.widget.unsupported_speech, UnsupportedSpeechPolicy::Silent);
    assert!(!config.resilience.timeout_disabled);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("UNIVERSE_SERVER__PORT", "9090");
        env::set_var("UNIVERSE_WIDGET__UNSUPPORTED_SPEECH", "alert");
        env::set_var("UNIVERSE_WIDGET__SESSION_TIMEOUT_SECS", "60");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.widget.unsupported_speech, UnsupportedSpeechPolicy::Alert);
    assert_eq!(config.widget.session_timeout_secs, 60);

    clear_env_vars();
}

#[test]
#[serial]
fn test_secret_env_names() {
    clear_env_vars();
    unsafe {
        env::set_var("CHAT_API_KEY", "secret");
        env::set_var("CHAT_BASE_URL", "http://localhost:9000");
        env::set_var("UNSPLASH_ACCESS_KEY", "unsplash");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.chat.api_key, "secret");
    assert_eq!(config.chat.base_url, "http://localhost:9000");
    assert_eq!(config.gallery.access_key, "unsplash");

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("UNIVERSE_SERVER__PORT", "9090");
        env::set_var("TIMEOUT_DISABLED", "true");
    }

    let config = AppConfig::load_from_args([BIN, "--port", "8181"]).expect("Failed to load config");
    assert_eq!(config.server.port, 8181);
    assert!(config.resilience.timeout_disabled);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    std::io::Write::write_all(
        &mut file,
        b"server:\n  port: 7070\nwidget:\n  assistant_name: Nova\n",
    )
    .expect("Failed to write temp config");

    // CONFIG_FILE is the env fallback for --config
    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.widget.assistant_name, "Nova");

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args([BIN, "--config", "/nonexistent/universe.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let cwd_path = "config.yaml";
    fs::write(cwd_path, "server:\n  port: 6060\n").expect("Failed to write ./config.yaml");

    let result = AppConfig::load_from_args([BIN]);

    // Clean up before asserting so a failure doesn't leak the file
    fs::remove_file(cwd_path).expect("Failed to remove ./config.yaml");

    let config = result.expect("Failed to load config");
    assert_eq!(config.server.port, 6060);
}
