use super::*;
use crate::config::LLMProvider;

fn parse(args: &[&str]) -> Args {
    Args::parse_from(std::iter::once("penflow-rs").chain(args.iter().copied()))
}

#[test]
fn test_writer_request_from_inline_args() {
    let args = parse(&[
        "--research", "R", "--products", "P", "--writing", "W",
    ]);
    let request = args.writer_request().unwrap();
    assert_eq!(request.research, "R");
    assert_eq!(request.products, "P");
    assert_eq!(request.writing, "W");
}

#[test]
fn test_writer_request_requires_all_three_parts() {
    let args = parse(&["--research", "R", "--products", "P"]);
    assert!(args.writer_request().is_err());
}

#[test]
fn test_writer_request_from_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("request.json");
    std::fs::write(&path, r#"{"research":"R","products":"P","writing":"W"}"#).unwrap();

    let args = parse(&["--request", path.to_str().unwrap()]);
    let request = args.writer_request().unwrap();
    assert_eq!(request.writing, "W");
}

#[test]
fn test_into_config_llm_overrides() {
    let args = parse(&[
        "--research", "R", "--products", "P", "--writing", "W",
        "--llm-provider", "deepseek",
        "--llm-api-base-url", "https://api.example.com/v1",
        "--llm-api-key", "sk-test",
        "--model", "deepseek-chat",
        "--max-tokens", "4096",
        "--temperature", "0.2",
    ]);
    let config = args.into_config();

    assert_eq!(config.llm.provider, LLMProvider::DeepSeek);
    assert_eq!(config.llm.api_base_url, "https://api.example.com/v1");
    assert_eq!(config.llm.api_key, "sk-test");
    assert_eq!(config.llm.model, "deepseek-chat");
    assert_eq!(config.llm.max_tokens, 4096);
    assert_eq!(config.llm.temperature, 0.2);
}

#[test]
fn test_into_config_unknown_provider_keeps_default() {
    let args = parse(&["--llm-provider", "nonsense"]);
    let config = args.into_config();
    assert_eq!(config.llm.provider, LLMProvider::OpenAI);
}

#[test]
fn test_into_config_session_overrides() {
    let args = parse(&[
        "--max-review-turns", "3",
        "--turn-timeout", "30",
        "--deadline", "120",
        "--skip-connection-check",
        "--verbose",
    ]);
    let config = args.into_config();

    assert_eq!(config.session.max_review_turns, 3);
    assert_eq!(config.session.turn_timeout_seconds, 30);
    assert_eq!(config.session.deadline_seconds, 120);
    assert!(config.skip_connection_check);
    assert!(config.verbose);
}

#[test]
fn test_into_config_prompts_dir_override() {
    let args = parse(&["--prompts-dir", "/tmp/custom-prompts"]);
    let config = args.into_config();
    assert_eq!(
        config.prompts_dir,
        std::path::PathBuf::from("/tmp/custom-prompts")
    );
}
