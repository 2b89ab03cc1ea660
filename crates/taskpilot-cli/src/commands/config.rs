//! Configuration management commands.

use taskpilot_core::Config;

/// Print the effective configuration, with secrets masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    println!("Configuration ({})", Config::config_dir().display());
    println!();
    println!("[general]");
    println!("model    = {}", config.general.model);
    println!("provider = {}", config.general.provider);
    println!("demo     = {}", config.demo_mode());
    println!();
    println!("[limits]");
    println!("max_tokens      = {}", config.limits.max_tokens);
    println!("temperature     = {}", config.limits.temperature);
    println!("error_threshold = {}", config.limits.error_threshold);
    println!();
    println!("[tracker]");
    println!(
        "base_url = {}",
        config.tracker.resolve_base_url().unwrap_or_else(|| "(not set)".to_string())
    );
    println!(
        "email    = {}",
        config.tracker.resolve_email().unwrap_or_else(|| "(not set)".to_string())
    );
    println!(
        "token    = {}",
        if config.tracker.resolve_api_token().is_some() { "(set)" } else { "(not set)" }
    );
    println!();
    println!("[knowledge]");
    println!("top_k         = {}", config.knowledge.top_k);
    println!("min_query_len = {}", config.knowledge.min_query_len);
    println!();
    println!("[workday]");
    println!("start             = {}", config.workday.start);
    println!("end               = {}", config.workday.end);
    println!("min_block_minutes = {}", config.workday.min_block_minutes);
    Ok(())
}
