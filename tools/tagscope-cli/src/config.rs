//! Settings read from `TAGSCOPE_*` variables, then overridden by flags

use tagscope_core::namespaces;
use tagscope_engine::set_env_field_values_with;

tagscope_core::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct CliConfig {
        /// Namespace used to name JSON fields.
        pub tag: String => r#"env:"TAGSCOPE_TAG""#,
        /// Indent JSON output.
        pub pretty: bool => r#"env:"TAGSCOPE_PRETTY""#,
        /// Fallback log filter when `RUST_LOG` is unset.
        pub log: String => r#"env:"TAGSCOPE_LOG""#,
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            tag: namespaces::API.to_string(),
            pretty: false,
            log: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> tagscope_core::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> tagscope_core::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        set_env_field_values_with(&mut config, lookup)?;
        Ok(config)
    }

    /// Flags win over the environment.
    pub fn with_overrides(
        mut self,
        tag: Option<String>,
        pretty: bool,
        log: Option<String>,
    ) -> Self {
        if let Some(tag) = tag {
            self.tag = tag;
        }
        if pretty {
            self.pretty = true;
        }
        if let Some(log) = log {
            self.log = log;
        }
        self
    }
}
