use super::*;
use anyhow::{anyhow, Result};
use std::collections::HashSet;

/// Validate the complete configuration
pub fn validate_config(config: &ClientConfig) -> Result<()> {
    validate_client_options(&config.client)?;
    validate_policies(&config.policies)?;
    validate_udf_options(&config.udf)?;

    Ok(())
}

/// Validate connection options
fn validate_client_options(options: &ClientOptions) -> Result<()> {
    let mut seen = HashSet::new();
    for seed in &options.seeds {
        validate_seed(seed)?;
        if !seen.insert(seed.trim_end_matches('/')) {
            return Err(anyhow!("Duplicate seed: {}", seed));
        }
    }

    validate_log_level(&options.log_level)
}

/// Validate a seed URL
pub fn validate_seed(seed: &str) -> Result<()> {
    let rest = seed
        .strip_prefix("http://")
        .ok_or_else(|| anyhow!("Seed must be an http:// URL, got: {}", seed))?;

    if rest.trim_end_matches('/').is_empty() {
        return Err(anyhow!("Seed has no host: {}", seed));
    }

    Ok(())
}

/// Validate a log level name
pub fn validate_log_level(level: &str) -> Result<()> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(anyhow!("Invalid log level: {}, must be one of: trace, debug, info, warn, error", level)),
    }
}

/// Validate policy defaults
fn validate_policies(policies: &PoliciesConfig) -> Result<()> {
    if policies.info.timeout.is_zero() {
        return Err(anyhow!("policies.info.timeout must be greater than 0"));
    }

    Ok(())
}

/// Validate UDF options
fn validate_udf_options(options: &UdfOptions) -> Result<()> {
    if options.max_module_size == 0 {
        return Err(anyhow!("udf.max_module_size must be greater than 0"));
    }

    let convergence = &options.convergence;
    if convergence.timeout.is_zero() {
        return Err(anyhow!("udf.convergence.timeout must be greater than 0"));
    }

    if convergence.poll_interval.is_zero() {
        return Err(anyhow!("udf.convergence.poll_interval must be greater than 0"));
    }

    if convergence.max_poll_interval < convergence.poll_interval {
        return Err(anyhow!(
            "udf.convergence.max_poll_interval ({:?}) must not be less than poll_interval ({:?})",
            convergence.max_poll_interval,
            convergence.poll_interval
        ));
    }

    Ok(())
}
