use crate::config::types::{
    ArchiveConfig, Config, CrawlerConfig, FetcherConfig, MarkupConfig, OutputConfig,
    ScheduleConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_archive_config(&config.archive)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_schedule_config(&config.schedule)?;
    validate_markup_config(&config.markup)?;
    Ok(())
}

/// Validates the source archive settings
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.target_count < 1 {
        return Err(ConfigError::Validation(
            "target_count must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry and timeout settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.initial_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "initial_backoff_ms ({}) cannot exceed max_backoff_ms ({})",
            config.initial_backoff_ms, config.max_backoff_ms
        )));
    }

    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_ms must be > 0".to_string(),
        ));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Longest accepted interval between two harvests: one year
const MAX_INTERVAL_HOURS: u64 = 24 * 366;

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_hours < 1 || config.interval_hours > MAX_INTERVAL_HOURS {
        return Err(ConfigError::Validation(format!(
            "interval_hours must be between 1 and {}, got {}",
            MAX_INTERVAL_HOURS, config.interval_hours
        )));
    }

    Ok(())
}

/// Validates selectors and field labels
fn validate_markup_config(config: &MarkupConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.container_selector,
        &config.text_selector,
        &config.listing_selector,
    ] {
        validate_selector(selector)?;
    }

    if config.id_attribute.trim().is_empty() {
        return Err(ConfigError::Validation(
            "id_attribute cannot be empty".to_string(),
        ));
    }

    for (name, label) in [
        ("author_label", &config.author_label),
        ("sender_label", &config.sender_label),
        ("recipient_label", &config.recipient_label),
        ("destination_label", &config.destination_label),
    ] {
        if label.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
