use anyhow::Context;

use schedcore::config::ParamTable;

use crate::common::cli::CommonOpts;

/// Knobs from the configuration file, overridden by `_CONDOR_*` variables and
/// then by `--set` options.
pub fn load_params(opts: &CommonOpts) -> anyhow::Result<ParamTable> {
    let params = match &opts.config {
        Some(path) => ParamTable::from_file(path)
            .with_context(|| format!("Cannot load configuration {}", path.display()))?,
        None => ParamTable::new(),
    };
    let mut params = params.with_env_overrides();
    for (name, value) in &opts.knobs {
        params.set(name, value.as_str());
    }
    Ok(params)
}

/// Parses `KNOB=VALUE`.
pub fn parse_knob(text: &str) -> anyhow::Result<(String, String)> {
    let Some((name, value)) = text.split_once('=') else {
        anyhow::bail!("Expected KNOB=VALUE, got '{text}'");
    };
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Empty knob name in '{text}'");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use schedcore::config::ParamSource;

    use super::{load_params, parse_knob};
    use crate::common::cli::CommonOpts;
    use crate::output::OutputMode;

    #[test]
    fn test_load_params_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "SYSTEM_PERIODIC_HOLD = \"NumJobStarts > 3\"\nNEGOTIATOR_RESOURCE_REQUEST_LIST_SIZE = 50"
        )
        .unwrap();
        let opts = CommonOpts {
            config: Some(file.path().to_path_buf()),
            knobs: vec![(
                "negotiator_resource_request_list_size".to_string(),
                "10".to_string(),
            )],
            output_mode: OutputMode::Cli,
            verbose: false,
        };
        let params = load_params(&opts).unwrap();
        assert_eq!(
            params.param("SYSTEM_PERIODIC_HOLD").as_deref(),
            Some("NumJobStarts > 3")
        );
        assert_eq!(
            params.param_integer("NEGOTIATOR_RESOURCE_REQUEST_LIST_SIZE", 200),
            10
        );
    }

    #[test]
    fn test_missing_config_file() {
        let opts = CommonOpts {
            config: Some("/nonexistent/schedtool.toml".into()),
            knobs: Vec::new(),
            output_mode: OutputMode::Cli,
            verbose: false,
        };
        assert!(load_params(&opts).is_err());
    }

    #[test]
    fn test_parse_knob() {
        assert_eq!(
            parse_knob("SYSTEM_PERIODIC_HOLD = NumJobStarts > 3").unwrap(),
            (
                "SYSTEM_PERIODIC_HOLD".to_string(),
                "NumJobStarts > 3".to_string()
            )
        );
        assert_eq!(
            parse_knob("X=a==b").unwrap(),
            ("X".to_string(), "a==b".to_string())
        );
        assert!(parse_knob("SYSTEM_PERIODIC_HOLD").is_err());
        assert!(parse_knob("=1").is_err());
    }
}
