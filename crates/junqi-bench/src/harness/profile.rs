use junqi_core::belief::{BeliefConfig, HqRevealTarget};
use thiserror::Error;

use crate::config::ProfileConfig;

const MAX_IPF_ITERATIONS: u64 = 64;

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("invalid parameter for profile '{name}': {message}")]
    InvalidParam { name: String, message: String },
}

/// A named belief configuration ready to spawn engines.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileBlueprint {
    pub name: String,
    pub config: BeliefConfig,
}

impl ProfileBlueprint {
    pub fn from_configs(configs: &[ProfileConfig]) -> Result<Vec<Self>, ProfileError> {
        configs.iter().map(Self::from_config).collect()
    }

    pub fn from_config(config: &ProfileConfig) -> Result<Self, ProfileError> {
        Ok(Self {
            name: config.name.clone(),
            config: parse_params(&config.name, &config.params)?,
        })
    }
}

fn parse_params(name: &str, params: &serde_yaml::Value) -> Result<BeliefConfig, ProfileError> {
    let mut config = BeliefConfig::default();
    if params.is_null() {
        return Ok(config);
    }

    let invalid = |message: String| ProfileError::InvalidParam {
        name: name.to_string(),
        message,
    };

    let mapping = params
        .as_mapping()
        .ok_or_else(|| invalid("expected mapping for profile params".to_string()))?;

    for (key, value) in mapping {
        match key.as_str() {
            Some("ipf_iterations") => {
                let iterations = value
                    .as_u64()
                    .ok_or_else(|| invalid("ipf_iterations must be an integer".to_string()))?;
                if !(1..=MAX_IPF_ITERATIONS).contains(&iterations) {
                    return Err(invalid(format!(
                        "ipf_iterations must be between 1 and {MAX_IPF_ITERATIONS}"
                    )));
                }
                config.ipf_iterations = iterations as usize;
            }
            Some("hq_reveal") => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("hq_reveal must be a string".to_string()))?;
                config.hq_reveal_target = match text.to_ascii_lowercase().as_str() {
                    "move_target" | "target" => HqRevealTarget::MoveTarget,
                    "headquarters" | "hq" => HqRevealTarget::Headquarters,
                    other => return Err(invalid(format!("unknown hq_reveal target '{other}'"))),
                };
            }
            Some("soft_decrement_ranked") => {
                config.soft_decrement_ranked = value
                    .as_bool()
                    .ok_or_else(|| invalid("soft_decrement_ranked must be a boolean".to_string()))?;
            }
            Some(other) => return Err(invalid(format!("unknown parameter '{other}'"))),
            None => return Err(invalid("parameter names must be strings".to_string())),
        }
    }

    Ok(config)
}
