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

    Headless front end. Attaches an image to a SASI controller and runs a
    script of host transactions against it.

*/

//! SASI headless front-end main library component.

#![forbid(unsafe_code)]

pub mod host;

use std::path::Path;

use anyhow::{bail, Context, Error};

use sasi_config::{cli_args, read_config_file, ConfigFileParams, ScriptAction};
use sasi_core::{create_hdf, open_hdf, BlockImage, SasiController};

use crate::host::{SasiHost, Transaction};

pub const DEFAULT_CONFIG_FILE: &str = "sasi.toml";
/// Number of bytes of transferred data shown in the summary.
pub const SUMMARY_BYTES: usize = 16;

/// Create a controller from the configuration's controller settings.
pub fn build_controller(config: &ConfigFileParams) -> SasiController {
    let c = &config.controller;
    let mut hdc = SasiController::new(Some(c.base_address), Some(c.system_clock_mhz));
    hdc.set_timings(c.req_delay_ns, c.select_delay_ns);
    hdc
}

/// Open the configured image, creating a blank one if allowed.
pub fn open_image(config: &ConfigFileParams) -> Result<Option<Box<dyn BlockImage>>, Error> {
    let Some(path) = config.image.path.as_deref() else {
        log::warn!("No hard disk image configured. Controller will report no drive.");
        return Ok(None);
    };

    if path.exists() {
        let image = open_hdf(path).with_context(|| format!("Failed to open image {:?}", path))?;
        log::info!("Opened image {:?}", path);
        Ok(Some(Box::new(image)))
    }
    else if config.image.create_if_missing {
        let image = create_hdf(path).with_context(|| format!("Failed to create image {:?}", path))?;
        log::info!("Created blank image {:?}", path);
        Ok(Some(Box::new(image)))
    }
    else {
        bail!("Image {:?} does not exist (use --create to create it)", path);
    }
}

/// Format up to [SUMMARY_BYTES] of `data` as hex.
pub fn hex_summary(data: &[u8]) -> String {
    let mut summary = data
        .iter()
        .take(SUMMARY_BYTES)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if data.len() > SUMMARY_BYTES {
        summary.push_str(" ...");
    }
    summary
}

/// Run each action as a complete transaction, stopping at the first host error.
pub fn run_script(hdc: &mut SasiController, actions: &[ScriptAction]) -> Result<Vec<Transaction>, Error> {
    let mut host = SasiHost::new(hdc);
    let mut results = Vec::with_capacity(actions.len());

    for action in actions {
        let result = host
            .run_action(action)
            .with_context(|| format!("Transaction failed: {}", action))?;

        println!(
            "{:<24} status: {:02X} message: {:02X} in: {} out: {}",
            action.to_string(),
            result.status,
            result.message,
            result.data_in.len(),
            result.data_out_len
        );
        if !result.data_in.is_empty() {
            println!("    {}", hex_summary(&result.data_in));
        }
        results.push(result);
    }
    Ok(results)
}

pub fn run_with_config(config: &ConfigFileParams) -> Result<Vec<Transaction>, Error> {
    let actions = config.script_actions()?;
    let mut hdc = build_controller(config);

    if let Some(image) = open_image(config)? {
        hdc.attach_image(image);
    }

    if actions.is_empty() {
        log::info!("No script actions given.");
    }
    let results = run_script(&mut hdc, &actions)?;

    let state = hdc.get_state();
    log::debug!("Final controller state: {:?}", state);
    println!(
        "{} transactions, {} data bytes read, {} data bytes written",
        results.len(),
        state.data_reads,
        state.data_writes
    );
    if let Some(mut image) = hdc.detach_image() {
        image.flush().context("Failed to flush image")?;
    }
    Ok(results)
}

pub fn run() -> Result<(), Error> {
    env_logger::init();

    let shell_args = cli_args().run();
    let config = read_config_file(Path::new(DEFAULT_CONFIG_FILE), shell_args).context("Failed to read configuration")?;

    run_with_config(&config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasi_config::read_config;
    use sasi_core::device_types::sasi::{SASI_BLOCK_SIZE, SASI_HD_BLOCKS};

    #[test]
    fn summary_is_truncated() {
        assert_eq!(hex_summary(&[0x01, 0xAB]), "01 AB");
        let summary = hex_summary(&[0u8; 20]);
        assert!(summary.ends_with(" ..."));
        assert_eq!(summary.matches("00").count(), SUMMARY_BYTES);
    }

    #[test]
    fn missing_image_without_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConfigFileParams::default();
        config.image.path = Some(dir.path().join("hd0.hdf"));
        assert!(open_image(&config).is_err());
    }

    #[test]
    fn no_image_configured() {
        let config = ConfigFileParams::default();
        assert!(open_image(&config).unwrap().is_none());

        let mut config = ConfigFileParams::default();
        config.cli_script = vec![ScriptAction::Read { lba: 0, blocks: 1 }];
        let results = run_with_config(&config).unwrap();
        assert_eq!(results[0].status, 0x02);
    }

    #[test]
    fn slow_controller_timings() {
        let toml = "[controller]\nreq_delay_ns = 200000.0\n\n[script]\nactions = [\"rezero\", \"sense\"]\n";
        let results = run_with_config(&read_config(toml, Default::default()).unwrap()).unwrap();
        assert_eq!(results[0].status, 0);
        assert_eq!(results[1].data_in, vec![0x01, 0x00, 0x00, 0x00]);

        let toml = "[controller]\nsystem_clock_mhz = 10000.0\n\n[script]\nactions = [\"rezero\"]\n";
        let results = run_with_config(&read_config(toml, Default::default()).unwrap()).unwrap();
        assert_eq!(results[0].status, 0);
    }

    #[test]
    fn create_and_persist_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hd0.hdf");
        let toml = format!(
            "[image]\npath = {:?}\ncreate_if_missing = true\n\n[script]\nactions = [\"write:1:0x5A:1\", \"read:1:1\"]\n",
            path.to_string_lossy()
        );
        let config = read_config(toml, Default::default()).unwrap();
        let results = run_with_config(&config).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[1].data_in.iter().all(|&b| b == 0x5A));

        let metadata = std::fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), (SASI_HD_BLOCKS * SASI_BLOCK_SIZE) as u64);

        // The image now exists and is reopened rather than recreated.
        let config = read_config(
            format!("[image]\npath = {:?}\n\n[script]\nactions = [\"read:1:1\"]\n", path.to_string_lossy()),
            Default::default(),
        )
        .unwrap();
        let results = run_with_config(&config).unwrap();
        assert!(results[0].data_in.iter().all(|&b| b == 0x5A));
    }
}
