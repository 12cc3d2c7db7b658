use crate::config::types::{
    AuthConfig, Config, FetchConfig, HarvestConfig, ImageConfig, OutputConfig, ScopeConfig,
    SelectorConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_scope_config(&config.scope)?;
    validate_selector_config(&config.selectors)?;
    validate_fetch_config(&config.fetch)?;
    if let Some(auth) = &config.auth {
        validate_auth_config(auth)?;
    }
    validate_image_config(&config.images)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl roots
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.roots.is_empty() {
        return Err(ConfigError::Validation(
            "harvest.roots must contain at least one URL".to_string(),
        ));
    }

    for root in &config.roots {
        let url = Url::parse(root)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root URL '{}': {}", root, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Root URL '{}' must use HTTP or HTTPS",
                root
            )));
        }
    }

    Ok(())
}

/// Validates the allowed domain list
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    if config.allowed_domains.is_empty() {
        return Err(ConfigError::Validation(
            "scope.allowed-domains must contain at least one domain".to_string(),
        ));
    }

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Every configured selector must compile
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    if config.content.is_empty() {
        return Err(ConfigError::Validation(
            "selectors.content must contain at least one selector".to_string(),
        ));
    }

    let all = config
        .content
        .iter()
        .chain(&config.title)
        .chain(&config.ignored)
        .chain(&config.navigation)
        .chain(&config.non_recursive)
        .chain(&config.fragments);

    for selector in all {
        compile_selector(selector)?;
    }

    if let Some(index) = &config.nested_index {
        if index.attribute.is_empty() {
            return Err(ConfigError::Validation(
                "selectors.nested-index.attribute cannot be empty".to_string(),
            ));
        }
        if !index.url_template.contains("{id}") {
            return Err(ConfigError::Validation(format!(
                "selectors.nested-index.url-template must contain '{{id}}', got '{}'",
                index.url_template
            )));
        }
    }

    Ok(())
}

/// Compiles a single CSS selector
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch.timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "fetch.user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    Url::parse(&config.login_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid auth.login-url: {}", e)))?;

    for (name, value) in [
        ("auth.username-field", &config.username_field),
        ("auth.password-field", &config.password_field),
        ("auth.username", &config.username),
        ("auth.password-env", &config.password_env),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_image_config(config: &ImageConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "images.max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.enabled && config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "images.directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output.directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)?;
    } else {
        validate_domain_string(pattern)?;
    }

    Ok(())
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // Intranet hosts are often bare names, but only localhost is accepted without a dot
    if !domain.contains('.') && domain != "localhost" {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'kb.example.com')",
            domain
        )));
    }

    Ok(())
}
