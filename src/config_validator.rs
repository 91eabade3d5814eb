use crate::config::Config;
use crate::error::ProxyError;

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a Redis URL
    pub fn validate_redis_url(url: &str) -> Result<(), ProxyError> {
        if url.is_empty() {
            return Err(ProxyError::Configuration(
                "Redis URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(ProxyError::Configuration(
                "Redis URL must start with 'redis://' or 'rediss://'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates the commerce backend base URL
    pub fn validate_upstream_url(url: &str) -> Result<(), ProxyError> {
        if url.is_empty() {
            return Err(ProxyError::Configuration(
                "Upstream base URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProxyError::Configuration(
                "Upstream base URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates pacing parameters
    pub fn validate_pacing(max_per_window: usize, window_ms: u64) -> Result<(), ProxyError> {
        if max_per_window == 0 {
            return Err(ProxyError::Configuration(
                "Requests per window must be greater than 0".to_string(),
            ));
        }

        if window_ms == 0 {
            return Err(ProxyError::Configuration(
                "Rate window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_ttl(name: &str, ttl_secs: u64) -> Result<(), ProxyError> {
        if ttl_secs == 0 {
            return Err(ProxyError::Configuration(format!(
                "{} cache TTL must be greater than 0",
                name
            )));
        }
        Ok(())
    }

    /// Validates a full service configuration before startup
    pub fn validate(config: &Config) -> Result<(), ProxyError> {
        Self::validate_upstream_url(&config.upstream_base_url)?;
        if config.upstream_timeout_ms == 0 {
            return Err(ProxyError::Configuration(
                "Upstream timeout must be greater than 0".to_string(),
            ));
        }
        Self::validate_pacing(config.max_requests_per_second, config.rate_window_ms)?;
        Self::validate_ttl("Catalog", config.catalog_cache_ttl_secs)?;
        Self::validate_ttl("Ratings", config.ratings_cache_ttl_secs)?;
        if let Some(url) = config.shared_cache_url() {
            Self::validate_redis_url(url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_redis_url() {
        assert!(ConfigValidator::validate_redis_url("redis://localhost:6379").is_ok());
        assert!(ConfigValidator::validate_redis_url("rediss://localhost:6379").is_ok());
    }

    #[test]
    fn test_invalid_redis_url() {
        assert!(ConfigValidator::validate_redis_url("").is_err());
        assert!(ConfigValidator::validate_redis_url("http://localhost:6379").is_err());
    }

    #[test]
    fn test_upstream_url() {
        assert!(ConfigValidator::validate_upstream_url("https://shop.example.com/api").is_ok());
        assert!(ConfigValidator::validate_upstream_url("").is_err());
        assert!(ConfigValidator::validate_upstream_url("ftp://shop.example.com").is_err());
    }

    #[test]
    fn test_invalid_pacing() {
        assert!(ConfigValidator::validate_pacing(2, 1000).is_ok());
        assert!(ConfigValidator::validate_pacing(0, 1000).is_err());
        assert!(ConfigValidator::validate_pacing(2, 0).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = Config {
            ratings_cache_ttl_secs: 0,
            ..Config::default()
        };
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_bad_redis_url_rejected_when_set() {
        let config = Config {
            redis_url: Some("memcached://localhost".to_string()),
            ..Config::default()
        };
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
