//! Diagnostic command to check configuration and integrations.

use taskpilot_core::Config;
use taskpilot_providers::ProviderRegistry;

pub async fn run(config: &Config) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    // Config directory
    let config_dir = Config::config_dir();
    println!("Config directory: {}", config_dir.display());
    if config_dir.exists() {
        println!("  ok: exists");
    } else {
        println!("  missing (created on first use)");
    }

    // Config validation
    println!("\nConfiguration:");
    let result = config.validate();
    if result.is_ok() {
        println!("  ok: valid");
    }
    for error in result.errors() {
        println!("  error: {}: {}", error.field, error.message);
    }
    for warning in result.warnings() {
        println!("  warning: {}: {}", warning.field, warning.message);
    }

    // Providers
    println!("\nProviders:");
    let registry = ProviderRegistry::from_config(config);
    for id in registry.list() {
        if let Some(provider) = registry.get(id) {
            let status = if provider.is_configured() { "ok" } else { "not configured" };
            println!("  {status}: {} ({id})", provider.name());
        }
    }
    match registry.default_provider() {
        Some(default) => println!("  default: {}", default.id()),
        None => println!("  default: none"),
    }

    // API keys and tracker credentials
    println!("\nCredentials:");
    if config.google_api_key().is_some() {
        println!("  ok: GOOGLE_API_KEY available");
    } else {
        println!("  missing: GOOGLE_API_KEY (demo mode will be used)");
    }
    if config.tracker.is_configured() {
        println!("  ok: tracker credentials available");
    } else {
        println!("  missing: TRACKER_URL / TRACKER_EMAIL / TRACKER_API_TOKEN (demo tracker will be used)");
    }

    if config.demo_mode() {
        println!("\nMode: demo (canned data, mock model replies)");
    } else {
        println!("\nMode: live");
    }

    Ok(())
}
