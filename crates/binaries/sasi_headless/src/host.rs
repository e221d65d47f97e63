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

    host.rs

    A minimal SASI host adapter. Drives the controller through its memory
    mapped registers the way the X68000's IOCS does: select, send the
    command, then follow the phase lines until the bus is released.

*/

use anyhow::{bail, Error};

use sasi_config::ScriptAction;
use sasi_core::{
    bus::{DeviceRunTimeUnit, MemoryMappedDevice},
    device_types::sasi::{
        SASI_BLOCK_SIZE,
        SASI_STATUS_BSY,
        SASI_STATUS_CD,
        SASI_STATUS_IO,
        SASI_STATUS_MSG,
        SASI_STATUS_REQ,
    },
    devices::hdc::x68k_sasi::{SASI_DATA_REGISTER, SASI_SELECT_REGISTER, SASI_STATUS_REGISTER},
    SasiController,
};

/// Minimum system ticks that elapse between each status poll.
pub const POLL_TICKS: u32 = 1;
/// The host polls at least this many times within one REQ delay.
pub const POLLS_PER_REQ: f64 = 8.0;
/// Give up waiting for REQ after this many REQ delays have elapsed.
pub const REQ_TIMEOUT_FACTOR: f64 = 4.0;

/// The result of a single SASI transaction.
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    pub status: u8,
    pub message: u8,
    pub data_in: Vec<u8>,
    pub data_out_len: usize,
    pub polls: u64,
}

pub struct SasiHost<'a> {
    hdc: &'a mut SasiController,
    base: usize,
    poll_delta: DeviceRunTimeUnit,
    poll_limit: u64,
    polls: u64,
}

/// Build the 6-byte command descriptor block for a scripted action.
pub fn command_block(action: &ScriptAction) -> [u8; 6] {
    let lba_bytes = |lba: u32| [((lba >> 16) & 0x1F) as u8, (lba >> 8) as u8, lba as u8];

    match *action {
        ScriptAction::Read { lba, blocks } => {
            let [b1, b2, b3] = lba_bytes(lba);
            [0x08, b1, b2, b3, blocks, 0]
        }
        ScriptAction::Write { lba, blocks, .. } => {
            let [b1, b2, b3] = lba_bytes(lba);
            [0x0A, b1, b2, b3, blocks, 0]
        }
        ScriptAction::Format { lba } => {
            let [b1, b2, b3] = lba_bytes(lba);
            [0x06, b1, b2, b3, 0x01, 0]
        }
        ScriptAction::Seek { lba } => {
            let [b1, b2, b3] = lba_bytes(lba);
            [0x0B, b1, b2, b3, 0, 0]
        }
        ScriptAction::Sense => [0x03, 0, 0, 0, 0, 0],
        ScriptAction::Rezero => [0x01, 0, 0, 0, 0, 0],
    }
}

/// The data sent to the controller for a scripted action, if any.
pub fn data_out(action: &ScriptAction) -> Vec<u8> {
    match *action {
        ScriptAction::Write { fill, blocks, .. } => vec![fill; blocks as usize * SASI_BLOCK_SIZE],
        _ => Vec::new(),
    }
}

impl<'a> SasiHost<'a> {
    pub fn new(hdc: &'a mut SasiController) -> Self {
        let base = hdc.base_address();
        let tick_ns = DeviceRunTimeUnit::SystemTicks(POLL_TICKS).to_ns(hdc.sysclock_mhz());
        let (req_delay_ns, select_delay_ns) = hdc.timings();
        let delay_ns = req_delay_ns.max(select_delay_ns);

        // Poll once per tick unless that would take too many polls to cover the REQ delay.
        let poll_ns = tick_ns.max(delay_ns / POLLS_PER_REQ);
        let poll_delta = if poll_ns > tick_ns {
            DeviceRunTimeUnit::Microseconds(poll_ns / 1000.0)
        }
        else {
            DeviceRunTimeUnit::SystemTicks(POLL_TICKS)
        };
        let poll_limit = if poll_ns > 0.0 {
            (delay_ns * REQ_TIMEOUT_FACTOR / poll_ns).ceil() as u64 + 2
        }
        else {
            2
        };
        log::debug!(
            "Host polling every {:.3}ns, REQ timeout after {} polls",
            poll_ns,
            poll_limit
        );

        Self {
            hdc,
            base,
            poll_delta,
            poll_limit,
            polls: 0,
        }
    }

    #[inline]
    fn register(&self, register: u8) -> usize {
        self.base + ((register as usize) << 1) + 1
    }

    fn read_status(&mut self) -> u8 {
        self.polls += 1;
        let address = self.register(SASI_STATUS_REGISTER);
        self.hdc.mmio_read_u8(address, self.poll_delta)
    }

    fn read_data(&mut self) -> u8 {
        let address = self.register(SASI_DATA_REGISTER);
        self.hdc.mmio_read_u8(address, self.poll_delta)
    }

    fn write_data(&mut self, data: u8) {
        let address = self.register(SASI_DATA_REGISTER);
        self.hdc
            .mmio_write_u8(address, data, self.poll_delta);
    }

    /// Poll the status port until REQ is asserted, returning the status port value.
    fn wait_req(&mut self) -> Result<u8, Error> {
        for _ in 0..self.poll_limit {
            let status = self.read_status();
            if status & SASI_STATUS_REQ != 0 {
                return Ok(status);
            }
        }
        bail!("Timed out waiting for REQ");
    }

    /// Select the controller. Fails if the controller is already busy.
    pub fn select(&mut self) -> Result<(), Error> {
        if self.read_status() & SASI_STATUS_BSY != 0 {
            bail!("Controller busy");
        }
        let address = self.register(SASI_SELECT_REGISTER);
        self.hdc
            .mmio_write_u8(address, 0x01, self.poll_delta);
        if self.read_status() & SASI_STATUS_BSY == 0 {
            bail!("Controller did not respond to selection");
        }
        let address = self.register(SASI_STATUS_REGISTER);
        self.hdc
            .mmio_write_u8(address, 0x00, self.poll_delta);
        Ok(())
    }

    /// Run a full transaction: select, send `command`, transfer data, then
    /// collect the status and message bytes.
    pub fn execute(&mut self, command: &[u8], data_out: &[u8]) -> Result<Transaction, Error> {
        let start_polls = self.polls;
        let mut result = Transaction::default();

        self.select()?;

        let mut command_iter = command.iter();
        let mut data_iter = data_out.iter();

        loop {
            let status = self.wait_req()?;
            let io = status & SASI_STATUS_IO != 0;
            let cd = status & SASI_STATUS_CD != 0;

            match (status & SASI_STATUS_MSG != 0, cd, io) {
                (true, _, _) => {
                    result.message = self.read_data();
                    break;
                }
                (false, true, true) => {
                    result.status = self.read_data();
                }
                (false, true, false) => match command_iter.next() {
                    Some(&byte) => self.write_data(byte),
                    None => bail!("Controller requested more than {} command bytes", command.len()),
                },
                (false, false, true) => {
                    let byte = self.read_data();
                    result.data_in.push(byte);
                }
                (false, false, false) => {
                    let byte = data_iter.next().copied().unwrap_or(0);
                    result.data_out_len += 1;
                    self.write_data(byte);
                }
            }
        }

        if self.read_status() != 0 {
            bail!("Controller did not release the bus");
        }
        result.polls = self.polls - start_polls;
        Ok(result)
    }

    pub fn run_action(&mut self, action: &ScriptAction) -> Result<Transaction, Error> {
        log::debug!("Running action: {}", action);
        self.execute(&command_block(action), &data_out(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasi_core::{device_types::sasi::SASI_STATUS_ERROR, HardDiskImage};

    fn controller_with_image(blocks: usize) -> SasiController {
        let mut hdc = SasiController::default();
        hdc.attach_image(Box::new(HardDiskImage::blank(blocks)));
        hdc
    }

    #[test]
    fn command_blocks() {
        assert_eq!(
            command_block(&ScriptAction::Read {
                lba: 0x12345,
                blocks: 2
            }),
            [0x08, 0x01, 0x23, 0x45, 0x02, 0x00]
        );
        assert_eq!(command_block(&ScriptAction::Format { lba: 0 }), [0x06, 0, 0, 0, 0x01, 0]);
        assert_eq!(command_block(&ScriptAction::Sense), [0x03, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn write_then_read_back() {
        let mut hdc = controller_with_image(16);
        let mut host = SasiHost::new(&mut hdc);

        let write = host
            .run_action(&ScriptAction::Write {
                lba: 3,
                fill: 0xE5,
                blocks: 2,
            })
            .unwrap();
        assert_eq!(write.status, 0);
        assert_eq!(write.message, 0);
        assert_eq!(write.data_out_len, 2 * SASI_BLOCK_SIZE);

        let read = host.run_action(&ScriptAction::Read { lba: 2, blocks: 4 }).unwrap();
        assert_eq!(read.status, 0);
        assert_eq!(read.data_in.len(), 4 * SASI_BLOCK_SIZE);
        assert!(read.data_in[..SASI_BLOCK_SIZE].iter().all(|&b| b == 0));
        assert!(read.data_in[SASI_BLOCK_SIZE..3 * SASI_BLOCK_SIZE].iter().all(|&b| b == 0xE5));
        assert!(read.data_in[3 * SASI_BLOCK_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn sense_and_no_data_commands() {
        let mut hdc = controller_with_image(40);
        let mut host = SasiHost::new(&mut hdc);

        let sense = host.run_action(&ScriptAction::Sense).unwrap();
        assert_eq!(sense.status, 0);
        assert_eq!(sense.data_in, vec![0x01, 0x00, 0x00, 0x00]);

        for action in [ScriptAction::Rezero, ScriptAction::Seek { lba: 5 }, ScriptAction::Format { lba: 0 }] {
            let result = host.run_action(&action).unwrap();
            assert_eq!(result.status, 0, "{}", action);
            assert!(result.data_in.is_empty());
        }
    }

    #[test]
    fn no_drive_reports_error_status() {
        let mut hdc = SasiController::default();
        let mut host = SasiHost::new(&mut hdc);

        let read = host.run_action(&ScriptAction::Read { lba: 0, blocks: 1 }).unwrap();
        assert_eq!(read.status, SASI_STATUS_ERROR);
        assert!(read.data_in.is_empty());

        let write = host
            .run_action(&ScriptAction::Write {
                lba: 0,
                fill: 0,
                blocks: 1,
            })
            .unwrap();
        assert_eq!(write.status, SASI_STATUS_ERROR);
        assert_eq!(write.data_out_len, 0);
    }

    #[test]
    fn unknown_command_reports_error_status() {
        let mut hdc = SasiController::default();
        let mut host = SasiHost::new(&mut hdc);

        let result = host.execute(&[0x00, 0, 0, 0, 0, 0], &[]).unwrap();
        assert_eq!(result.status, SASI_STATUS_ERROR);
        assert_eq!(result.message, 0);
    }

    #[test]
    fn select_fails_when_busy() {
        let mut hdc = SasiController::default();
        let mut host = SasiHost::new(&mut hdc);
        host.select().unwrap();
        assert!(host.select().is_err());
    }

    #[test]
    fn slow_req_delay_and_fast_clock() {
        let mut hdc = SasiController::new(None, Some(10000.0));
        hdc.attach_image(Box::new(HardDiskImage::blank(4)));
        let mut host = SasiHost::new(&mut hdc);
        assert_eq!(host.run_action(&ScriptAction::Rezero).unwrap().status, 0);

        let mut hdc = SasiController::default();
        hdc.set_timings(200_000.0, 45.0);
        hdc.attach_image(Box::new(HardDiskImage::blank(4)));
        let mut host = SasiHost::new(&mut hdc);
        assert_eq!(host.run_action(&ScriptAction::Rezero).unwrap().status, 0);
        let read = host.run_action(&ScriptAction::Read { lba: 1, blocks: 1 }).unwrap();
        assert_eq!(read.data_in.len(), SASI_BLOCK_SIZE);
    }

    #[test]
    fn host_waits_for_req() {
        // At 10MHz each poll is 100ns, so REQ returns no sooner than 5 polls after a byte
        let mut hdc = controller_with_image(1);
        let mut host = SasiHost::new(&mut hdc);
        let result = host.run_action(&ScriptAction::Rezero).unwrap();
        assert!(result.polls >= 7 * 5);
    }
}
