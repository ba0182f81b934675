use anyhow::Result;

use crate::domain::models::Config;

/// Handle `config show`. Secrets are masked.
pub fn handle_show(config: &Config, json: bool) -> Result<()> {
    let mut effective = config.clone();
    if effective.llm.api_key.is_some() {
        effective.llm.api_key = Some("********".to_string());
    }
    if effective.discovery.token.is_some() {
        effective.discovery.token = Some("********".to_string());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        print!("{}", serde_yaml::to_string(&effective)?);
    }
    Ok(())
}
