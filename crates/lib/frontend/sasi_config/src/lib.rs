/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    lib.rs

    Configuration file and command line handling.

*/

//! The `sasi_config` crate reads the emulator's configuration file and overlays
//! command line arguments on top of it. Command line arguments always take
//! priority over the configuration file.
//!
//! A missing configuration file is not an error; every setting has a default.

mod bpaf_config;
mod script;

use std::path::{Path, PathBuf};

pub use bpaf_config::{cli_args, CmdLineArgs};
pub use script::{ScriptAction, MAX_LBA};

use sasi_core::{
    device_types::sasi::{SASI_REQ_DELAY_NS, SASI_SELECT_DELAY_NS},
    devices::hdc::x68k_sasi::{DEFAULT_BASE_ADDRESS, DEFAULT_SYSCLOCK_MHZ, MAP_SIZE},
};
use serde_derive::Deserialize;

/// The controller's registers must fit within the X68000's 24-bit address space.
pub const MAX_BASE_ADDRESS: usize = 0x100_0000 - MAP_SIZE;

const fn _default_base_address() -> usize {
    DEFAULT_BASE_ADDRESS
}
const fn _default_req_delay_ns() -> f64 {
    SASI_REQ_DELAY_NS
}
const fn _default_select_delay_ns() -> f64 {
    SASI_SELECT_DELAY_NS
}
const fn _default_system_clock_mhz() -> f64 {
    DEFAULT_SYSCLOCK_MHZ
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't read config file {path:?}: {source}")]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid script action '{action}': {reason}")]
    Script { action: String, reason: String },
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Controller {
    #[serde(default = "_default_base_address")]
    pub base_address: usize,
    #[serde(default = "_default_req_delay_ns")]
    pub req_delay_ns: f64,
    #[serde(default = "_default_select_delay_ns")]
    pub select_delay_ns: f64,
    #[serde(default = "_default_system_clock_mhz")]
    pub system_clock_mhz: f64,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            base_address: _default_base_address(),
            req_delay_ns: _default_req_delay_ns(),
            select_delay_ns: _default_select_delay_ns(),
            system_clock_mhz: _default_system_clock_mhz(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Image {
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub create_if_missing: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileParams {
    #[serde(default)]
    pub controller: Controller,
    #[serde(default)]
    pub image: Image,
    #[serde(default)]
    pub script: Script,
    /// Actions given on the command line. These replace the file's script if present.
    #[serde(skip)]
    pub cli_script: Vec<ScriptAction>,
}

impl ConfigFileParams {
    pub fn overlay(&mut self, shell_args: CmdLineArgs) {
        if let Some(image) = shell_args.image {
            self.image.path = Some(image);
        }
        if let Some(base_address) = shell_args.base_address {
            self.controller.base_address = base_address;
        }
        self.image.create_if_missing |= shell_args.create;
        self.cli_script = shell_args.script;
    }

    /// Check that the controller settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.controller;
        if c.base_address & 0x01 != 0 {
            return Err(ConfigError::InvalidValue {
                field:  "base_address",
                reason: format!("{:#X} is not word aligned", c.base_address),
            });
        }
        if c.base_address > MAX_BASE_ADDRESS {
            return Err(ConfigError::InvalidValue {
                field:  "base_address",
                reason: format!("{:#X} is outside the 24-bit address space", c.base_address),
            });
        }
        for (field, value) in [("req_delay_ns", c.req_delay_ns), ("select_delay_ns", c.select_delay_ns)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{} is not a valid delay", value),
                });
            }
        }
        if !c.system_clock_mhz.is_finite() || c.system_clock_mhz <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field:  "system_clock_mhz",
                reason: format!("{} is not a valid clock rate", c.system_clock_mhz),
            });
        }
        Ok(())
    }

    /// Resolve the list of host actions to run. Command line actions take priority.
    pub fn script_actions(&self) -> Result<Vec<ScriptAction>, ConfigError> {
        if !self.cli_script.is_empty() {
            return Ok(self.cli_script.clone());
        }
        self.script
            .actions
            .iter()
            .map(|action| {
                action.parse::<ScriptAction>().map_err(|reason| ConfigError::Script {
                    action: action.clone(),
                    reason,
                })
            })
            .collect()
    }
}

/// Parse a configuration string and overlay the provided command line arguments.
pub fn read_config(toml_string: impl AsRef<str>, shell_args: CmdLineArgs) -> Result<ConfigFileParams, ConfigError> {
    let mut toml_args: ConfigFileParams = toml::from_str(toml_string.as_ref())?;
    toml_args.overlay(shell_args);
    toml_args.validate()?;
    Ok(toml_args)
}

/// Read the configuration file named on the command line, or `default_path` if none was given.
/// A missing default configuration file is replaced by defaults.
pub fn read_config_file<P>(default_path: P, shell_args: CmdLineArgs) -> Result<ConfigFileParams, ConfigError>
where
    P: AsRef<Path>,
{
    let read = |path: &Path| {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
    };

    let toml_string = if let Some(configfile_path) = shell_args.config_file.as_ref() {
        log::debug!("Reading config file: {:?}", configfile_path);
        read(configfile_path.as_path())?
    }
    else if default_path.as_ref().exists() {
        log::debug!("Reading default config file: {:?}", default_path.as_ref());
        read(default_path.as_ref())?
    }
    else {
        log::debug!("No config file found, using defaults.");
        String::new()
    };

    read_config(toml_string, shell_args)
}
