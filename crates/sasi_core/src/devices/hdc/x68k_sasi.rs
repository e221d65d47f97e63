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

    devices::hdc::x68k_sasi.rs

    Implements the custom SASI hard disk controller of the Sharp X68000.

    Register map (odd bytes from the base address 0xE96000):

     +1 (R/W) - SASI data I/O
     +3 (W)   - SEL signal high (write 0 to enter the command phase)
     +3 (R)   - SASI status port
                  - bit 4 = MSG - if 1, content of data line is a message
                  - bit 3 = C/D - if 1, content of data line is a command or status,
                                  otherwise it is data.
                  - bit 2 = I/O - if 0, Host -> Controller, otherwise Controller -> Host.
                  - bit 1 = BSY - if 1, the controller is busy.
                  - bit 0 = REQ - if 1, the controller is ready for the next byte.
     +5 (W)   - data is arbitrary, no effect
     +7 (W)   - SEL signal low (write non-zero to select the controller)

*/

use std::{
    fmt,
    fmt::{Debug, Formatter},
    io::SeekFrom,
};

use serde_derive::{Deserialize, Serialize};

use crate::{
    bus::{DeviceRunTimeUnit, MemRangeDescriptor, MemoryMappedDevice, NO_IO_BYTE},
    device_types::sasi::{
        command_length,
        command_lba,
        SasiCommand,
        SasiPhase,
        SasiStatusPort,
        SASI_BLOCK_SIZE,
        SASI_COMMAND_MAX_LEN,
        SASI_FORMAT_BLOCKS,
        SASI_REQ_DELAY_NS,
        SASI_SELECT_DELAY_NS,
        SASI_SENSE_LEN,
        SASI_SENSE_NO_INDEX,
        SASI_STATUS_ERROR,
        SASI_STATUS_GOOD,
    },
    devices::hdc::req_timer::ReqTimer,
    hdf::BlockImage,
};

pub const DEFAULT_BASE_ADDRESS: usize = 0xE96000;
pub const DEFAULT_SYSCLOCK_MHZ: f64 = 10.0;

pub const REGISTER_CT: usize = 4;
pub const REG_SHIFT: usize = 1;
pub const MAP_SIZE: usize = REGISTER_CT << REG_SHIFT;

pub const SASI_DATA_REGISTER: u8 = 0x00;
pub const SASI_STATUS_REGISTER: u8 = 0x01;
pub const SASI_NULL_REGISTER: u8 = 0x02;
pub const SASI_SELECT_REGISTER: u8 = 0x03;

type CommandDispatchFn = fn(&mut SasiController);

/// A serializable copy of the controller's state.
///
/// The attached image is not part of the snapshot, only the image position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SasiSnapshot {
    pub phase: SasiPhase,
    pub status_port: u8,
    pub status: u8,
    pub command: [u8; SASI_COMMAND_MAX_LEN],
    pub command_byte_count: usize,
    pub command_byte_total: usize,
    pub current_command: u8,
    pub sense: [u8; SASI_SENSE_LEN],
    pub transfer_byte_count: usize,
    pub transfer_byte_total: usize,
    pub req_pending_ns: Option<f64>,
    pub image_position: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct SasiDebugState {
    pub phase: String,
    pub status_port: String,
    pub status: String,
    pub command: String,
    pub command_bytes: String,
    pub transfer_bytes: String,
    pub req_pending: bool,
    pub drive_present: bool,
    pub data_reads: u64,
    pub data_writes: u64,
}

pub struct SasiController {
    base_address: usize,
    sysclock_mhz: f64,
    req_delay_ns: f64,
    select_delay_ns: f64,
    image: Option<Box<dyn BlockImage>>,

    phase: SasiPhase,
    status_port: SasiStatusPort,
    status: u8,
    command: [u8; SASI_COMMAND_MAX_LEN],
    command_byte_count: usize,
    command_byte_total: usize,
    current_command: u8,
    sense: [u8; SASI_SENSE_LEN],
    transfer_byte_count: usize,
    transfer_byte_total: usize,
    req_timer: ReqTimer,

    data_reads:  u64,
    data_writes: u64,
}

impl Debug for SasiController {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasiController")
            .field("phase", &self.phase)
            .field("status_port", &self.status_port)
            .field("status", &self.status)
            .field("command", &self.command)
            .field("drive_present", &self.image.is_some())
            .finish()
    }
}

impl Default for SasiController {
    fn default() -> Self {
        Self {
            base_address: DEFAULT_BASE_ADDRESS,
            sysclock_mhz: DEFAULT_SYSCLOCK_MHZ,
            req_delay_ns: SASI_REQ_DELAY_NS,
            select_delay_ns: SASI_SELECT_DELAY_NS,
            image: None,

            phase: SasiPhase::BusFree,
            status_port: SasiStatusPort::new(),
            status: SASI_STATUS_GOOD,
            command: [0; SASI_COMMAND_MAX_LEN],
            command_byte_count: 0,
            command_byte_total: 0,
            current_command: 0,
            sense: [0; SASI_SENSE_LEN],
            transfer_byte_count: 0,
            transfer_byte_total: 0,
            req_timer: ReqTimer::new(),

            data_reads: 0,
            data_writes: 0,
        }
    }
}

impl SasiController {
    pub fn new(base_address: Option<usize>, sysclock_mhz: Option<f64>) -> Self {
        Self {
            base_address: base_address.unwrap_or(DEFAULT_BASE_ADDRESS),
            sysclock_mhz: sysclock_mhz.unwrap_or(DEFAULT_SYSCLOCK_MHZ),
            ..Default::default()
        }
    }

    /// Override the REQ pacing delays.
    pub fn set_timings(&mut self, req_delay_ns: f64, select_delay_ns: f64) {
        self.req_delay_ns = req_delay_ns;
        self.select_delay_ns = select_delay_ns;
    }

    /// The REQ pacing delays as (byte delay, selection delay), in nanoseconds.
    #[inline]
    pub fn timings(&self) -> (f64, f64) {
        (self.req_delay_ns, self.select_delay_ns)
    }

    #[inline]
    pub fn sysclock_mhz(&self) -> f64 {
        self.sysclock_mhz
    }

    pub fn reset(&mut self) {
        log::trace!("Resetting SASI controller...");
        self.reset_bus();
        self.command = [0; SASI_COMMAND_MAX_LEN];
        self.command_byte_count = 0;
        self.command_byte_total = 0;
        self.current_command = 0;
        self.sense = [0; SASI_SENSE_LEN];
        self.transfer_byte_count = 0;
        self.transfer_byte_total = 0;
        self.data_reads = 0;
        self.data_writes = 0;
    }

    pub fn attach_image(&mut self, image: Box<dyn BlockImage>) {
        log::debug!("SASI: hard disk image attached");
        self.image = Some(image);
    }

    pub fn detach_image(&mut self) -> Option<Box<dyn BlockImage>> {
        if let Some(image) = self.image.as_mut() {
            if let Err(e) = image.flush() {
                log::error!("SASI: error flushing image on detach: {}", e);
            }
        }
        self.image.take()
    }

    #[inline]
    pub fn drive_present(&self) -> bool {
        self.image.is_some()
    }

    #[inline]
    pub fn phase(&self) -> SasiPhase {
        self.phase
    }

    #[inline]
    pub fn status_port(&self) -> u8 {
        self.status_port.byte()
    }

    /// The completion status byte that will be presented in the status phase.
    #[inline]
    pub fn status(&self) -> u8 {
        self.status
    }

    #[inline]
    pub fn base_address(&self) -> usize {
        self.base_address
    }

    /// Run the controller for the specified amount of time, firing the REQ timer if due.
    pub fn run(&mut self, delta: DeviceRunTimeUnit) {
        let elapsed_ns = delta.to_ns(self.sysclock_mhz);
        if self.req_timer.run(elapsed_ns) {
            log::trace!("SASI: REQ asserted in phase {}", self.phase);
            self.status_port.set_req(true);
        }
    }

    /// Read a controller register. All offsets are valid; unmapped registers read 0xFF.
    pub fn read_register(&mut self, offset: u8) -> u8 {
        match offset {
            SASI_DATA_REGISTER => self.data_register_read(),
            SASI_STATUS_REGISTER => self.status_port.byte(),
            // Write-only
            SASI_NULL_REGISTER | SASI_SELECT_REGISTER => NO_IO_BYTE,
            _ => {
                log::warn!("SASI: read from invalid register: {:02X}", offset);
                NO_IO_BYTE
            }
        }
    }

    /// Write a controller register. All offsets are valid; unmapped writes are ignored.
    pub fn write_register(&mut self, offset: u8, data: u8) {
        match offset {
            SASI_DATA_REGISTER => self.data_register_write(data),
            SASI_STATUS_REGISTER => {
                if data == 0 {
                    self.select_high();
                }
            }
            SASI_NULL_REGISTER => {}
            SASI_SELECT_REGISTER => {
                if data != 0 {
                    self.select_low();
                }
            }
            _ => {
                log::warn!("SASI: write to invalid register: {:02X}", offset);
            }
        }
    }

    pub fn register_list(&self) -> Vec<(String, usize)> {
        vec![
            (String::from("SASI Data Register"), self.register_address(SASI_DATA_REGISTER)),
            (String::from("SASI Status Register"), self.register_address(SASI_STATUS_REGISTER)),
            (String::from("SASI Null Register"), self.register_address(SASI_NULL_REGISTER)),
            (String::from("SASI Select Register"), self.register_address(SASI_SELECT_REGISTER)),
        ]
    }

    #[inline]
    fn register_address(&self, register: u8) -> usize {
        self.base_address + ((register as usize) << REG_SHIFT) + 1
    }

    /// Decode an address into a register offset. Only odd bytes are connected.
    fn decode_register(&self, address: usize) -> Option<u8> {
        let offset = address.checked_sub(self.base_address)?;
        if offset >= MAP_SIZE || offset & 0x01 == 0 {
            return None;
        }
        Some((offset >> REG_SHIFT) as u8)
    }

    fn set_phase(&mut self, phase: SasiPhase) {
        log::debug!("SASI: phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Drop REQ until the controller is ready for the next byte.
    fn pulse_req(&mut self) {
        self.status_port.set_req(false);
        self.req_timer.adjust(self.req_delay_ns);
    }

    /// Release the bus. All status lines are dropped.
    fn reset_bus(&mut self) {
        self.set_phase(SasiPhase::BusFree);
        self.status = SASI_STATUS_GOOD;
        self.status_port = SasiStatusPort::new();
        self.req_timer.cancel();
    }

    /// SEL asserted: move from bus free to selection.
    fn select_low(&mut self) {
        if self.phase == SasiPhase::BusFree {
            self.set_phase(SasiPhase::Selection);
            self.status_port.set_bsy(true);
        }
    }

    /// SEL released: move from selection to the command phase.
    fn select_high(&mut self) {
        if self.phase == SasiPhase::Selection {
            self.set_phase(SasiPhase::Command);
            // Data port expects a command or status
            self.status_port.set_cd(true);
            self.command_byte_count = 0;
            self.command_byte_total = 0;
            self.req_timer.adjust(self.select_delay_ns);
        }
    }

    /// Enter the status phase reporting an error, as when no drive is connected.
    fn no_drive_error(&mut self) {
        log::warn!("SASI: No HD connected.");
        self.set_phase(SasiPhase::Status);
        self.status_port.set_io(true);
        self.status_port.set_cd(true);
        self.status = SASI_STATUS_ERROR;
    }

    fn end_transfer(&mut self) {
        self.set_phase(SasiPhase::Status);
        self.status_port.set_io(true);
        self.status_port.set_cd(true);
    }

    fn seek_image(&mut self, lba: u32) {
        let pos = lba as u64 * SASI_BLOCK_SIZE as u64;
        if let Some(image) = self.image.as_mut() {
            if let Err(e) = image.seek(SeekFrom::Start(pos)) {
                log::error!("SASI: seek to LBA {:06X} failed: {}", lba, e);
            }
        }
    }

    fn data_register_read(&mut self) -> u8 {
        match self.phase {
            SasiPhase::Message => {
                self.reset_bus();
                0
            }
            SasiPhase::Status => {
                self.set_phase(SasiPhase::Message);
                self.status_port.set_msg(true);
                self.pulse_req();
                self.status
            }
            SasiPhase::Read => self.read_phase_byte(),
            _ => 0,
        }
    }

    fn data_register_write(&mut self, data: u8) {
        match self.phase {
            SasiPhase::Write => self.write_phase_byte(data),
            SasiPhase::Command => self.command_phase_byte(data),
            _ => {
                log::trace!("SASI: data write {:02X} ignored in phase {}", data, self.phase);
            }
        }
    }

    /// Transfer one byte from controller to host during the read phase.
    fn read_phase_byte(&mut self) -> u8 {
        let command = SasiCommand::from_opcode(self.command[0]);

        if self.transfer_byte_count == 0 {
            self.transfer_byte_total = match command {
                Some(SasiCommand::RequestSense) => {
                    self.sense = [SASI_SENSE_NO_INDEX, 0, 0, 0];
                    match self.command[3] {
                        0 => SASI_SENSE_LEN,
                        n => n as usize,
                    }
                }
                Some(SasiCommand::Read) => SASI_BLOCK_SIZE * self.command[4] as usize,
                _ => 0,
            };
        }

        let mut byte = NO_IO_BYTE;
        match command {
            Some(SasiCommand::RequestSense) => {
                // Sense lengths beyond the sense buffer read as zero.
                byte = self.sense.get(self.transfer_byte_count).copied().unwrap_or(0);
                log::debug!("REQUEST SENSE: read value {:02X}", byte);
            }
            Some(SasiCommand::Read) => match self.image.as_mut() {
                Some(image) => {
                    let mut buf = [0u8; 1];
                    byte = match image.read(&mut buf) {
                        Ok(1) => buf[0],
                        Ok(_) => {
                            log::warn!("SASI: read past end of image");
                            0
                        }
                        Err(e) => {
                            log::error!("SASI: image read failed: {}", e);
                            0
                        }
                    };
                }
                None => {
                    // Output (C/D remains the same)
                    log::warn!("SASI: No HD connected.");
                    self.set_phase(SasiPhase::Status);
                    self.status_port.set_io(true);
                    self.status = SASI_STATUS_ERROR;
                }
            },
            _ => byte = 0,
        }

        self.data_reads += 1;
        self.pulse_req();
        self.transfer_byte_count += 1;
        if self.transfer_byte_count >= self.transfer_byte_total {
            self.end_transfer();
            log::debug!("SASI: Read transfer complete");
        }
        byte
    }

    /// Transfer one byte from host to controller during the write phase.
    fn write_phase_byte(&mut self, data: u8) {
        let command = SasiCommand::from_opcode(self.command[0]);

        if self.transfer_byte_count == 0 {
            self.transfer_byte_total = match command {
                Some(SasiCommand::Specify) => 10,
                Some(SasiCommand::Write) => SASI_BLOCK_SIZE * self.command[4] as usize,
                _ => SASI_BLOCK_SIZE,
            };
        }

        match command {
            Some(SasiCommand::Specify) => {
                log::debug!("SPECIFY: wrote {:02X}", data);
            }
            Some(SasiCommand::Write) => match self.image.as_mut() {
                Some(image) => match image.write(&[data]) {
                    Ok(1) => {}
                    Ok(_) => log::warn!("SASI: write past end of image"),
                    Err(e) => log::error!("SASI: image write failed: {}", e),
                },
                None => {
                    // Output (C/D remains the same)
                    log::warn!("SASI: No HD connected.");
                    self.set_phase(SasiPhase::Status);
                    self.status_port.set_io(true);
                    self.status = SASI_STATUS_ERROR;
                }
            },
            _ => {}
        }

        self.data_writes += 1;
        self.pulse_req();
        self.transfer_byte_count += 1;
        if self.transfer_byte_count >= self.transfer_byte_total {
            if let Some(image) = self.image.as_mut() {
                if let Err(e) = image.flush() {
                    log::error!("SASI: image flush failed: {}", e);
                }
            }
            self.end_transfer();
            log::debug!("SASI: Write transfer complete");
        }
    }

    /// Receive one byte of a command descriptor block.
    fn command_phase_byte(&mut self, data: u8) {
        if self.command_byte_count == 0 {
            // High 3 bits determine command class, and therefore, length
            self.current_command = data;
            self.command_byte_total = command_length(data);
        }

        if let Some(slot) = self.command.get_mut(self.command_byte_count) {
            *slot = data;
        }
        self.pulse_req();

        self.command_byte_count += 1;
        if self.command_byte_count >= self.command_byte_total {
            self.dispatch_command();
        }
    }

    fn dispatch_command(&mut self) {
        let command_fn: CommandDispatchFn = match SasiCommand::from_opcode(self.command[0]) {
            Some(SasiCommand::RezeroUnit) => SasiController::command_rezero_unit,
            Some(SasiCommand::RequestSense) => SasiController::command_request_sense,
            Some(SasiCommand::Specify) => SasiController::command_specify,
            Some(SasiCommand::Read) => SasiController::command_read,
            Some(SasiCommand::Write) => SasiController::command_write,
            Some(SasiCommand::Seek) => SasiController::command_seek,
            Some(SasiCommand::FormatUnit | SasiCommand::FormatUnit06) => SasiController::command_format_unit,
            None => SasiController::command_invalid,
        };
        command_fn(self);
    }

    /// SASI command 0x01: Rezero Unit
    fn command_rezero_unit(&mut self) {
        log::debug!("SASI: REZERO UNIT");
        self.set_phase(SasiPhase::Status);
        // Output, C/D remains the same
        self.status_port.set_io(true);
    }

    /// SASI command 0x03: Request Sense
    fn command_request_sense(&mut self) {
        log::debug!("SASI: REQUEST SENSE");
        self.set_phase(SasiPhase::Read);
        self.status_port.set_io(true);
        self.status_port.set_cd(false);
        self.transfer_byte_count = 0;
        self.transfer_byte_total = 0;
    }

    /// SASI command 0xC2: Specify. The drive parameters that follow are discarded.
    fn command_specify(&mut self) {
        log::debug!("SASI: SPECIFY");
        self.set_phase(SasiPhase::Write);
        self.status_port.set_io(false);
        self.status_port.set_cd(false);
        self.transfer_byte_count = 0;
        self.transfer_byte_total = 0;
    }

    /// SASI command 0x08: Read
    fn command_read(&mut self) {
        if self.image.is_none() {
            self.no_drive_error();
            return;
        }

        self.set_phase(SasiPhase::Read);
        self.status_port.set_io(true);
        self.status_port.set_cd(false);
        self.transfer_byte_count = 0;
        self.transfer_byte_total = 0;
        let lba = command_lba(&self.command);
        self.seek_image(lba);
        log::debug!("SASI: READ (LBA {:06X}, blocks = {})", lba, self.command[4]);
    }

    /// SASI command 0x0A: Write
    fn command_write(&mut self) {
        if self.image.is_none() {
            self.no_drive_error();
            return;
        }

        self.set_phase(SasiPhase::Write);
        self.status_port.set_io(false);
        self.status_port.set_cd(false);
        self.transfer_byte_count = 0;
        self.transfer_byte_total = 0;
        let lba = command_lba(&self.command);
        self.seek_image(lba);
        log::debug!("SASI: WRITE (LBA {:06X}, blocks = {})", lba, self.command[4]);
    }

    /// SASI command 0x0B: Seek
    ///
    /// No seek is performed and the address bytes are not decoded; the LBA is always logged as 0.
    fn command_seek(&mut self) {
        self.set_phase(SasiPhase::Status);
        self.status_port.set_io(true);
        self.status_port.set_cd(true);
        log::debug!("SASI: SEEK (LBA {:06X})", 0);
    }

    /// SASI command 0x04/0x06: Format Unit
    ///
    /// The X68000 command layout differs from the SASI documentation:
    ///   0 | 0x06
    ///   1 | Unit number (0-7) | LBA MSB (low 5 bits)
    ///   2 | LBA
    ///   3 | LBA LSB
    ///   4 | ?? (usually 0x01)
    ///   5 | ??
    fn command_format_unit(&mut self) {
        if self.image.is_none() {
            self.no_drive_error();
            return;
        }

        self.set_phase(SasiPhase::Status);
        self.status_port.set_io(true);
        self.status_port.set_cd(true);
        let lba = command_lba(&self.command);
        self.seek_image(lba);

        let blank = vec![0u8; SASI_BLOCK_SIZE * SASI_FORMAT_BLOCKS];
        if let Some(image) = self.image.as_mut() {
            match image.write(&blank) {
                Ok(n) if n < blank.len() => {
                    log::warn!("SASI: short write formatting unit: {} of {} bytes", n, blank.len());
                }
                Ok(_) => {}
                Err(e) => log::error!("SASI: format write failed: {}", e),
            }
        }
        log::debug!("SASI: FORMAT UNIT (LBA {:06X})", lba);
    }

    fn command_invalid(&mut self) {
        log::warn!(
            "SASI: Invalid or unimplemented SASI command ({:02X}) received.",
            self.command[0]
        );
        self.set_phase(SasiPhase::Status);
        // Output (C/D remains the same)
        self.status_port.set_io(true);
        self.status = SASI_STATUS_ERROR;
    }

    /// Capture the controller state for a save state.
    pub fn snapshot(&mut self) -> SasiSnapshot {
        let image_position = match self.image.as_mut() {
            Some(image) => match image.seek(SeekFrom::Current(0)) {
                Ok(pos) => Some(pos),
                Err(e) => {
                    log::error!("SASI: couldn't read image position: {}", e);
                    None
                }
            },
            None => None,
        };

        SasiSnapshot {
            phase: self.phase,
            status_port: self.status_port.byte(),
            status: self.status,
            command: self.command,
            command_byte_count: self.command_byte_count,
            command_byte_total: self.command_byte_total,
            current_command: self.current_command,
            sense: self.sense,
            transfer_byte_count: self.transfer_byte_count,
            transfer_byte_total: self.transfer_byte_total,
            req_pending_ns: self.req_timer.remaining_ns(),
            image_position,
        }
    }

    /// Restore the controller state from a save state. Any attached image is
    /// repositioned to where it was when the snapshot was taken.
    pub fn restore(&mut self, snapshot: &SasiSnapshot) {
        self.phase = snapshot.phase;
        self.status_port = SasiStatusPort::from_bytes([snapshot.status_port]);
        self.status = snapshot.status;
        self.command = snapshot.command;
        self.command_byte_count = snapshot.command_byte_count.min(SASI_COMMAND_MAX_LEN);
        self.command_byte_total = snapshot.command_byte_total.min(SASI_COMMAND_MAX_LEN);
        self.current_command = snapshot.current_command;
        self.sense = snapshot.sense;
        self.transfer_byte_count = snapshot.transfer_byte_count;
        self.transfer_byte_total = snapshot.transfer_byte_total;

        self.req_timer.cancel();
        if let Some(remaining) = snapshot.req_pending_ns {
            self.req_timer.adjust(remaining);
        }

        if let (Some(image), Some(pos)) = (self.image.as_mut(), snapshot.image_position) {
            if let Err(e) = image.seek(SeekFrom::Start(pos)) {
                log::error!("SASI: couldn't restore image position {}: {}", pos, e);
            }
        }
        log::debug!("SASI: restored state in phase {}", self.phase);
    }

    pub fn get_state(&self) -> SasiDebugState {
        let port = self.status_port;
        let flag = |set: bool, name: &'static str| if set { name } else { "---" };

        SasiDebugState {
            phase: self.phase.as_ref().to_string(),
            status_port: format!(
                "{:02X} [{} {} {} {} {}]",
                port.byte(),
                flag(port.msg(), "MSG"),
                flag(port.cd(), "C/D"),
                flag(port.io(), "I/O"),
                flag(port.bsy(), "BSY"),
                flag(port.req(), "REQ"),
            ),
            status: format!("{:02X}", self.status),
            command: match SasiCommand::from_opcode(self.current_command) {
                Some(cmd) => format!("{:02X} ({})", self.current_command, cmd),
                None => format!("{:02X} (invalid)", self.current_command),
            },
            command_bytes: format!("{}/{}", self.command_byte_count, self.command_byte_total),
            transfer_bytes: format!("{}/{}", self.transfer_byte_count, self.transfer_byte_total),
            req_pending: self.req_timer.pending(),
            drive_present: self.image.is_some(),
            data_reads: self.data_reads,
            data_writes: self.data_writes,
        }
    }
}

impl MemoryMappedDevice for SasiController {
    fn mmio_read_u8(&mut self, address: usize, delta: DeviceRunTimeUnit) -> u8 {
        self.run(delta);
        match self.decode_register(address) {
            Some(register) => self.read_register(register),
            None => NO_IO_BYTE,
        }
    }

    fn mmio_read_u16(&mut self, address: usize, delta: DeviceRunTimeUnit) -> u16 {
        // Registers occupy the low (odd) byte of each word.
        let byte = self.mmio_read_u8(address | 0x01, delta);
        (NO_IO_BYTE as u16) << 8 | byte as u16
    }

    fn mmio_peek_u8(&self, address: usize) -> u8 {
        match self.decode_register(address) {
            Some(SASI_STATUS_REGISTER) => self.status_port.byte(),
            _ => NO_IO_BYTE,
        }
    }

    fn mmio_write_u8(&mut self, address: usize, data: u8, delta: DeviceRunTimeUnit) {
        self.run(delta);
        if let Some(register) = self.decode_register(address) {
            self.write_register(register, data);
        }
    }

    fn mmio_write_u16(&mut self, address: usize, data: u16, delta: DeviceRunTimeUnit) {
        self.mmio_write_u8(address | 0x01, (data & 0xFF) as u8, delta);
    }

    fn get_mapping(&self) -> Vec<MemRangeDescriptor> {
        vec![MemRangeDescriptor::new(self.base_address, MAP_SIZE, false)]
    }
}
