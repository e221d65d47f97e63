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

    device_types::sasi.rs

    Defines types common to implementations of a SASI hard disk controller.

    The SASI bus is the direct predecessor of SCSI. A single initiator (the
    host) selects the controller, transfers a command descriptor block, then
    moves through data, status and message phases before releasing the bus.

*/

use modular_bitfield::{bitfield, prelude::B3};
use serde_derive::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

/// SASI block size. All LBA addressing is in units of this size.
pub const SASI_BLOCK_SIZE: usize = 256;
/// Number of blocks on a blank 20MB image.
pub const SASI_HD_BLOCKS: usize = 0x013C98;
/// FORMAT UNIT clears this many blocks starting at the command LBA.
pub const SASI_FORMAT_BLOCKS: usize = 33;

pub const SASI_COMMAND_MAX_LEN: usize = 10;
pub const SASI_SENSE_LEN: usize = 4;

pub const SASI_STATUS_GOOD: u8 = 0x00;
pub const SASI_STATUS_ERROR: u8 = 0x02;

/// Sense byte 0 reported in response to REQUEST SENSE: "No index signal"
pub const SASI_SENSE_NO_INDEX: u8 = 0x01;

pub const SASI_STATUS_REQ: u8 = 0x01;
pub const SASI_STATUS_BSY: u8 = 0x02;
pub const SASI_STATUS_IO: u8 = 0x04;
pub const SASI_STATUS_CD: u8 = 0x08;
pub const SASI_STATUS_MSG: u8 = 0x10;

/// Delay before REQ is reasserted after a byte is transferred.
pub const SASI_REQ_DELAY_NS: f64 = 450.0;
/// Delay before REQ is asserted on entering the command phase.
pub const SASI_SELECT_DELAY_NS: f64 = 45.0;

/// The SASI status port. Bits 5-7 are unused and always read 0.
#[bitfield]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SasiStatusPort {
    pub req: bool, // Request - controller is ready for the next byte
    pub bsy: bool, // Busy
    pub io:  bool, // I/O - 0: host -> controller, 1: controller -> host
    pub cd:  bool, // Command/Data - 1: command or status on the data lines
    pub msg: bool, // Message
    #[skip]
    unused: B3,
}

impl SasiStatusPort {
    #[inline]
    pub fn byte(&self) -> u8 {
        self.into_bytes()[0]
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, AsRefStr, Serialize, Deserialize)]
pub enum SasiPhase {
    #[default]
    BusFree,
    Selection,
    Command,
    Read,
    Write,
    Status,
    Message,
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum SasiCommand {
    RezeroUnit = 0x01,
    RequestSense = 0x03,
    FormatUnit = 0x04,
    // The X68000 issues 0x06 for Format Unit, despite the SASI documentation listing 0x04.
    FormatUnit06 = 0x06,
    Read = 0x08,
    Write = 0x0A,
    Seek = 0x0B,
    Specify = 0xC2,
}

impl SasiCommand {
    /// Decode an opcode. Returns None for opcodes the controller doesn't implement,
    /// including TEST UNIT READY (0x00).
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0x01 => Some(SasiCommand::RezeroUnit),
            0x03 => Some(SasiCommand::RequestSense),
            0x04 => Some(SasiCommand::FormatUnit),
            0x06 => Some(SasiCommand::FormatUnit06),
            0x08 => Some(SasiCommand::Read),
            0x0A => Some(SasiCommand::Write),
            0x0B => Some(SasiCommand::Seek),
            0xC2 => Some(SasiCommand::Specify),
            _ => None,
        }
    }

    #[inline]
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

/// Return the length of a command descriptor block, given its first byte.
/// The high three bits select the command class, which determines the length.
pub fn command_length(first_byte: u8) -> usize {
    match first_byte >> 5 {
        0 => 6,
        1 => 10,
        2 => 8,
        _ => 6,
    }
}

/// Extract the 21-bit logical block address from a 6-byte command descriptor block.
///
/// Byte 1 carries the unit number in its top 3 bits and the LBA MSB in the low 5.
pub fn command_lba(command: &[u8]) -> u32 {
    (command[3] as u32) | (command[2] as u32) << 8 | ((command[1] & 0x1F) as u32) << 16
}
