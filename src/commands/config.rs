use anyhow::Result;

use crate::config::Settings;

/// Prints the effective settings with credentials masked.
pub fn show_config(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_config() {
        let mut settings = Settings::default();
        settings.api_token = Some("t".to_string());
        assert!(show_config(&settings).is_ok());
    }
}
