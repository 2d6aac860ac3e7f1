//! Environment ingestion for the boot sequence.
//!
//! Every environment variable the bootstrap consumes is declared here and
//! read exactly once, at argument-parse time. Nothing else in the crate
//! reads ambient process state; the resolver, the materializer, and the
//! supervisor all receive this record (or values derived from it).

use clap::Args;
use secrecy::{ExposeSecret, SecretString};

pub(crate) fn parse_secret(s: &str) -> Result<SecretString, std::convert::Infallible> {
    Ok(SecretString::from(s.to_owned()))
}

/// Returns the secret only if it is set and non-empty. Container platforms
/// routinely export declared-but-blank variables.
pub(crate) fn non_empty(secret: Option<&SecretString>) -> Option<&SecretString> {
    secret.filter(|s| !s.expose_secret().is_empty())
}

/// Credentials and overrides consumed from the deploy environment.
#[derive(Args, Debug, Clone)]
pub struct BootEnv {
    /// API key for the primary model provider, passed through to the gateway
    #[arg(
        long,
        env = "ANTHROPIC_API_KEY",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pub anthropic_api_key: SecretString,

    /// API key for the secondary model provider
    #[arg(
        long,
        env = "OPENAI_API_KEY",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pub openai_api_key: Option<SecretString>,

    /// Gateway token override; takes precedence over any persisted token
    #[arg(
        long,
        env = "GATEWAY_TOKEN",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pub gateway_token: Option<SecretString>,

    /// Default model identifier written into the configuration document
    #[arg(long, env = "GATEWAY_MODEL", value_name = "MODEL")]
    pub model: Option<String>,

    /// Telegram bot token; enables the telegram channel
    #[arg(
        long,
        env = "TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pub telegram_bot_token: Option<SecretString>,

    /// Discord bot token; enables the discord channel
    #[arg(
        long,
        env = "DISCORD_BOT_TOKEN",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pub discord_bot_token: Option<SecretString>,

    /// Slack bot OAuth token; the slack channel also requires the app token
    #[arg(
        long,
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pub slack_bot_token: Option<SecretString>,

    /// Slack app-level token for socket mode
    #[arg(
        long,
        env = "SLACK_APP_TOKEN",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pub slack_app_token: Option<SecretString>,
}

impl BootEnv {
    /// Variables exported into the target service's environment.
    ///
    /// The gateway receives the provider keys and the resolved token; every
    /// other inherited variable passes through the spawn untouched.
    pub fn exports(&self, token: &SecretString) -> Vec<(String, SecretString)> {
        let mut vars = vec![
            ("ANTHROPIC_API_KEY".to_string(), self.anthropic_api_key.clone()),
            ("GATEWAY_TOKEN".to_string(), token.clone()),
        ];
        if let Some(key) = non_empty(self.openai_api_key.as_ref()) {
            vars.push(("OPENAI_API_KEY".to_string(), key.clone()));
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[test]
    fn blank_credentials_count_as_absent() {
        let blank = secret("");
        let set = secret("xoxb-1");
        assert!(non_empty(Some(&blank)).is_none());
        assert!(non_empty(Some(&set)).is_some());
        assert!(non_empty(None).is_none());
    }

    #[test]
    fn exports_skip_unset_secondary_key() {
        let env = BootEnv {
            anthropic_api_key: secret("sk-ant"),
            openai_api_key: None,
            gateway_token: None,
            model: None,
            telegram_bot_token: None,
            discord_bot_token: None,
            slack_bot_token: None,
            slack_app_token: None,
        };
        let vars = env.exports(&secret("tok"));
        let names: Vec<_> = vars.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["ANTHROPIC_API_KEY", "GATEWAY_TOKEN"]);
    }
}
