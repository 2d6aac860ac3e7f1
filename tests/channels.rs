//! Channel inclusion rules: an entry appears exactly when its full required
//! credential set is present, and the document stays well-formed for zero,
//! one, or many entries.

use secrecy::SecretString;
use warmgate::config::build_document;
use warmgate::env::BootEnv;

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn base_env() -> BootEnv {
    BootEnv {
        anthropic_api_key: secret("sk-ant-test"),
        openai_api_key: None,
        gateway_token: None,
        model: None,
        telegram_bot_token: None,
        discord_bot_token: None,
        slack_bot_token: None,
        slack_app_token: None,
    }
}

fn document_value(env: &BootEnv) -> serde_json::Value {
    let doc = build_document(env, &secret("tok"), "0.0.0.0".parse().unwrap(), 8080);
    let bytes = serde_json::to_vec_pretty(&doc).unwrap();
    // Whatever the channel subset, the serialized form must parse back.
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn no_credentials_no_channel_section() {
    let value = document_value(&base_env());
    assert!(value.get("channels").is_none());
}

#[test]
fn telegram_needs_only_its_bot_token() {
    let mut env = base_env();
    env.telegram_bot_token = Some(secret("123:abc"));
    let value = document_value(&env);
    assert_eq!(value["channels"]["telegram"]["bot_token"], "123:abc");
    assert!(value["channels"].get("discord").is_none());
    assert!(value["channels"].get("slack").is_none());
}

#[test]
fn discord_needs_only_its_bot_token() {
    let mut env = base_env();
    env.discord_bot_token = Some(secret("discord-tok"));
    let value = document_value(&env);
    assert_eq!(value["channels"]["discord"]["bot_token"], "discord-tok");
}

#[test]
fn slack_requires_the_full_credential_pair() {
    let mut bot_only = base_env();
    bot_only.slack_bot_token = Some(secret("xoxb-1"));
    assert!(document_value(&bot_only).get("channels").is_none());

    let mut app_only = base_env();
    app_only.slack_app_token = Some(secret("xapp-1"));
    assert!(document_value(&app_only).get("channels").is_none());

    let mut both = base_env();
    both.slack_bot_token = Some(secret("xoxb-1"));
    both.slack_app_token = Some(secret("xapp-1"));
    let value = document_value(&both);
    assert_eq!(value["channels"]["slack"]["bot_token"], "xoxb-1");
    assert_eq!(value["channels"]["slack"]["app_token"], "xapp-1");
}

#[test]
fn blank_credentials_do_not_enable_a_channel() {
    let mut env = base_env();
    env.telegram_bot_token = Some(secret(""));
    env.slack_bot_token = Some(secret("xoxb-1"));
    env.slack_app_token = Some(secret(""));
    assert!(document_value(&env).get("channels").is_none());
}

#[test]
fn every_channel_at_once_stays_well_formed() {
    let mut env = base_env();
    env.telegram_bot_token = Some(secret("123:abc"));
    env.discord_bot_token = Some(secret("discord-tok"));
    env.slack_bot_token = Some(secret("xoxb-1"));
    env.slack_app_token = Some(secret("xapp-1"));

    let value = document_value(&env);
    let channels = value["channels"].as_object().unwrap();
    assert_eq!(channels.len(), 3);
    assert!(channels.contains_key("telegram"));
    assert!(channels.contains_key("discord"));
    assert!(channels.contains_key("slack"));
}
