use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use directories_next::ProjectDirs;
use serde::{Serialize, de::DeserializeOwned};

use brickwork::settings::Settings;

// -------------------------------------------------------------------------------------------------

/// Load [`Settings`] from a platform-appropriate configuration directory, creating the
/// file with default values if it does not exist.
///
/// This does not respect command-line options. Use [`SettingsArgs`] for that.
pub fn load_config() -> Result<Settings, anyhow::Error> {
    let project_dirs = ProjectDirs::from("org", "", "brickwork")
        .ok_or_else(|| anyhow::anyhow!("could not find configuration directory"))?;
    load_config_from(project_dirs.config_dir())
}

fn load_config_from(config_dir: &Path) -> Result<Settings, anyhow::Error> {
    fs::create_dir_all(config_dir)?;
    Ok(read_or_create_default_json_file(
        "render settings",
        &config_dir.join("settings.json"),
        Settings::default,
    ))
}

// -------------------------------------------------------------------------------------------------

/// [`clap::Args`] argument group struct for args that affect what settings are used.
#[derive(Clone, Debug, clap::Args)]
pub struct SettingsArgs {
    /// Ignore all configuration files, using only defaults and command-line options.
    #[arg(long = "no-config-files")]
    pub(crate) no_config_files: bool,

    #[allow(clippy::doc_markdown, reason = "will be displayed in --help")]
    /// Override the value of a setting for this run, instead of taking it from files
    /// or defaults.
    ///
    /// The value is specified as a key-value pair where the key is an unquoted string, the
    /// separator is “=”, and the value is a JSON value (which, if a string, must be quoted);
    /// for example: -Stone_mapping='"Aces"'
    #[arg(long = "set", short = 'S', value_parser = parse_configure, value_name="NAME=JSON")]
    pub(crate) set: Vec<(String, serde_json::Value)>,
}

impl SettingsArgs {
    /// Constructs the [`Settings`] a run with these args should use.
    ///
    /// The result has been [repaired](Settings::repair).
    pub fn build_settings(self) -> Result<Settings, anyhow::Error> {
        let persisted = if self.no_config_files {
            Settings::default()
        } else {
            load_config().context("Error loading configuration files")?
        };
        self.build_settings_with_base(persisted)
    }

    /// Constructs the [`Settings`] a run with these args should use, starting from
    /// `settings` instead of configuration files.
    pub fn build_settings_with_base(self, settings: Settings) -> Result<Settings, anyhow::Error> {
        let Self {
            no_config_files: _,
            set: to_override,
        } = self;

        if to_override.is_empty() {
            return Ok(settings.repair());
        }
        let serde_json::Value::Object(mut current_settings) = serde_json::to_value(&settings)
            .context("settings could not be converted to JSON")?
        else {
            anyhow::bail!("settings should appear as a JSON object");
        };
        for (key, value) in to_override {
            if !current_settings.contains_key(&key) {
                log::warn!("--set {key}=... does not name a known setting");
            }
            current_settings.insert(key, value);
        }
        let settings: Settings =
            serde_json::from_value(serde_json::Value::Object(current_settings))
                .context("--set did not produce valid settings")?;
        Ok(settings.repair())
    }
}

fn parse_configure(arg: &str) -> Result<(String, serde_json::Value), anyhow::Error> {
    let (key, value) = arg.split_once('=').ok_or_else(|| anyhow::anyhow!("missing '='"))?;
    let value = serde_json::from_str(value)?;
    Ok((key.to_owned(), value))
}

// -------------------------------------------------------------------------------------------------

fn read_or_create_default_json_file<V: DeserializeOwned + Serialize>(
    description: &str,
    path: &Path,
    default: fn() -> V,
) -> V {
    match File::open(path) {
        Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
            Ok(value) => {
                log::trace!(
                    "Loaded {description} from {path}",
                    path = path.to_string_lossy()
                );
                value
            }
            Err(e) => {
                log::warn!(
                    "Syntax error in {description} loaded from {path}; \
                    using default values. Error: {e}",
                    path = path.to_string_lossy(),
                );
                default()
            }
        },
        Err(open_for_read_error) if open_for_read_error.kind() == std::io::ErrorKind::NotFound => {
            log::info!(
                "No {description} file found; creating {path}",
                path = path.to_string_lossy()
            );
            let value = default();
            let written = serde_json::to_string_pretty(&value)
                .map_err(std::io::Error::from)
                .and_then(|json_text| fs::write(path, json_text.as_bytes()));
            match written {
                Ok(()) => log::trace!(
                    "Wrote default {description} to {path}",
                    path = path.to_string_lossy()
                ),
                Err(write_error) => {
                    log::error!(
                        "Error while writing default {description} file {path}: {write_error}",
                        path = path.to_string_lossy(),
                    );
                }
            }
            value
        }
        Err(e) => {
            log::error!(
                "Error while reading {description} file {path}: {e}",
                path = path.to_string_lossy(),
            );
            default()
        }
    }
}
