use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{DatabaseSettings, LoggingSettings, MembershipSettings, ServerSettings, Settings};

/// Environment variables kept for compatibility with existing deployments,
/// mapped onto their configuration keys.
const LEGACY_DB_VARS: [(&str, &str); 4] = [
    ("DB_HOST", "database.host"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
];

/// Command-line options that influence how the configuration is loaded.
#[cfg(feature = "clap")]
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigArgs {
    /// Path to a TOML configuration file. Defaults to `config.toml` if present.
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

/// Loads the application configuration.
///
/// Sources, lowest precedence first:
/// 1. built-in defaults,
/// 2. the TOML file at `path` (required), or `config.toml` if it exists,
/// 3. `APP__SECTION__KEY` environment variables,
/// 4. `DB_HOST`, `DB_USER`, `DB_PASSWORD` and `DB_NAME`.
///
/// A `.env` file in the working directory is loaded into the environment first.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    build(path, app_environment(None), |key| std::env::var(key).ok())
}

/// `APP__SECTION__KEY` variables, read from `source` or, when `None`, from the
/// process environment. Values stay strings until deserialization, so a
/// password like `0123` is not turned into a number.
fn app_environment(source: Option<config::Map<String, String>>) -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("__")
        .separator("__")
        .source(source)
}

fn build(
    path: Option<&Path>,
    environment: config::Environment,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path.to_path_buf())
            .format(config::FileFormat::Toml)
            .required(true),
        None => config::File::new("config.toml", config::FileFormat::Toml).required(false),
    };

    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&Settings::default())?)
        .add_source(file)
        .add_source(environment);

    for (var, key) in LEGACY_DB_VARS {
        builder = builder.set_override_option(key, lookup(var))?;
    }

    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
