use crate::config::{Config, ConfigError, ConfigPaths, EngineConfig};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Print config with secrets redacted
    #[arg(long)]
    pub print: bool,

    /// Set a config value (dotted key=value)
    #[arg(long, value_name = "key=value")]
    pub set: Vec<String>,
}

pub fn run(args: &ConfigArgs, paths: &ConfigPaths) -> Result<(), ConfigError> {
    let mut config = Config::load_or_create(paths)?;

    if !args.set.is_empty() {
        for assignment in &args.set {
            apply_set(&mut config, assignment)?;
        }
        config.validate()?;
        Config::write(paths, &config)?;
    }

    if args.print || args.set.is_empty() {
        let redacted = config.redacted();
        let output = toml::to_string_pretty(&redacted)?;
        println!("{output}");
    }

    Ok(())
}

fn apply_set(config: &mut Config, assignment: &str) -> Result<(), ConfigError> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| ConfigError::Validation("expected key=value for --set".into()))?;
    let key = key.trim();
    let raw_value = value;
    let value = value.trim();

    if let Some(rest) = key.strip_prefix("engines.") {
        let (name, field) = rest
            .split_once('.')
            .ok_or_else(|| ConfigError::Validation(format!("unknown config key: {key}")))?;
        let engine = match name {
            "bart" => &mut config.engines.bart,
            "t5" => &mut config.engines.t5,
            _ => {
                return Err(ConfigError::Validation(format!(
                    "unknown engine {name}; expected bart or t5"
                )));
            }
        };
        return set_engine_field(engine, key, field, raw_value);
    }

    match key {
        "server.host" => {
            config.server.host = value.to_string();
        }
        "server.port" => {
            config.server.port = value
                .parse()
                .map_err(|_| ConfigError::Validation(format!("{key} expects a port number")))?;
        }
        "summarize.max_length" => {
            config.summarize.max_length = parse_usize(value, key)?;
        }
        "summarize.min_length" => {
            config.summarize.min_length = parse_usize(value, key)?;
        }
        "summarize.fallback_words" => {
            config.summarize.fallback_words = parse_usize(value, key)?;
        }
        "summarize.chunk_words" => {
            config.summarize.chunk_words = parse_usize(value, key)?;
        }
        "summarize.strategy" => {
            config.summarize.strategy = value.to_string();
        }
        "transcript.language" => {
            config.transcript.language = value.to_string();
        }
        "transcript.base_url" => {
            config.transcript.base_url = value.to_string();
        }
        _ => {
            return Err(ConfigError::Validation(format!(
                "unknown config key: {key}"
            )));
        }
    }
    Ok(())
}

fn set_engine_field(
    engine: &mut EngineConfig,
    key: &str,
    field: &str,
    value: &str,
) -> Result<(), ConfigError> {
    // The prefix is sent verbatim, so only leading whitespace is dropped.
    if field == "prefix" {
        engine.prefix = Some(value.trim_start().to_string());
        return Ok(());
    }
    let value = value.trim();
    match field {
        "provider" => engine.provider = value.to_string(),
        "model" => engine.model = value.to_string(),
        "api_key" => engine.api_key = value.to_string(),
        "base_url" => engine.base_url = value.to_string(),
        "input_ceiling" => engine.input_ceiling = Some(parse_usize(value, key)?),
        _ => {
            return Err(ConfigError::Validation(format!(
                "unknown config key: {key}"
            )));
        }
    }
    Ok(())
}

fn parse_usize(value: &str, key: &str) -> Result<usize, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} expects an unsigned integer")))
}

#[cfg(test)]
mod tests {
    use super::apply_set;
    use crate::config::Config;

    #[test]
    fn sets_nested_engine_fields() {
        let mut config = Config::default();
        apply_set(&mut config, "engines.t5.input_ceiling=800").unwrap();
        apply_set(&mut config, "engines.bart.provider = extractive").unwrap();
        assert_eq!(config.engines.t5.input_ceiling, Some(800));
        assert_eq!(config.engines.bart.provider, "extractive");
    }

    #[test]
    fn prefix_keeps_trailing_separator() {
        let mut config = Config::default();
        config.engines.t5.prefix = None;
        apply_set(&mut config, "engines.t5.prefix=summarize: ").unwrap();
        assert_eq!(config.engines.t5.prefix.as_deref(), Some("summarize: "));

        apply_set(&mut config, "engines.bart.prefix=").unwrap();
        assert_eq!(config.engines.bart.prefix.as_deref(), Some(""));
    }

    #[test]
    fn sets_top_level_sections() {
        let mut config = Config::default();
        apply_set(&mut config, "server.port=9001").unwrap();
        apply_set(&mut config, "summarize.strategy=chunked").unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.summarize.strategy, "chunked");
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let mut config = Config::default();
        assert!(apply_set(&mut config, "server.tls=true").is_err());
        assert!(apply_set(&mut config, "engines.pegasus.model=x").is_err());
        assert!(apply_set(&mut config, "summarize.max_length=lots").is_err());
        let err = apply_set(&mut config, "no-equals").unwrap_err();
        assert!(err.to_string().contains("key=value"));
    }
}
