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

    script.rs

    Host actions that can be scripted from the command line or configuration file.
    Each action is a complete SASI transaction.

    Syntax (numbers are decimal, or hex with a 0x prefix):
        read:LBA:COUNT          Read COUNT blocks starting at LBA
        write:LBA:BYTE:COUNT    Fill COUNT blocks starting at LBA with BYTE
        format:LBA              Format the unit starting at LBA
        sense                   Request sense
        rezero                  Rezero unit
        seek:LBA                Seek to LBA

*/

use std::{fmt, str::FromStr};

/// LBAs are 21 bits wide in a 6-byte command.
pub const MAX_LBA: u32 = 0x1F_FFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScriptAction {
    Read { lba: u32, blocks: u8 },
    Write { lba: u32, fill: u8, blocks: u8 },
    Format { lba: u32 },
    Sense,
    Rezero,
    Seek { lba: u32 },
}

pub(crate) fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let result = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    result.map_err(|_| format!("Invalid number: {s}"))
}

fn parse_lba(s: Option<&str>) -> Result<u32, String> {
    let lba = parse_number(s.ok_or("Missing LBA")?)?;
    if lba > MAX_LBA {
        return Err(format!("LBA out of range: {lba:#X}"));
    }
    Ok(lba)
}

fn parse_byte(s: Option<&str>, what: &str) -> Result<u8, String> {
    let value = parse_number(s.ok_or(format!("Missing {what}"))?)?;
    u8::try_from(value).map_err(|_| format!("{what} out of range: {value}"))
}

impl FromStr for ScriptAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let action = parts.next().unwrap_or_default().to_lowercase();

        let parsed = match action.as_str() {
            "read" => ScriptAction::Read {
                lba: parse_lba(parts.next())?,
                blocks: parse_byte(parts.next(), "block count")?,
            },
            "write" => ScriptAction::Write {
                lba: parse_lba(parts.next())?,
                fill: parse_byte(parts.next(), "fill byte")?,
                blocks: parse_byte(parts.next(), "block count")?,
            },
            "format" => ScriptAction::Format {
                lba: parse_lba(parts.next())?,
            },
            "sense" => ScriptAction::Sense,
            "rezero" => ScriptAction::Rezero,
            "seek" => ScriptAction::Seek {
                lba: parse_lba(parts.next())?,
            },
            other => return Err(format!("Unknown action: {other}")),
        };

        if let Some(extra) = parts.next() {
            return Err(format!("Unexpected argument: {extra}"));
        }
        Ok(parsed)
    }
}

impl fmt::Display for ScriptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptAction::Read { lba, blocks } => write!(f, "read:{:#X}:{}", lba, blocks),
            ScriptAction::Write { lba, fill, blocks } => write!(f, "write:{:#X}:{:#04X}:{}", lba, fill, blocks),
            ScriptAction::Format { lba } => write!(f, "format:{:#X}", lba),
            ScriptAction::Sense => write!(f, "sense"),
            ScriptAction::Rezero => write!(f, "rezero"),
            ScriptAction::Seek { lba } => write!(f, "seek:{:#X}", lba),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_actions() {
        assert_eq!("read:0:2".parse::<ScriptAction>(), Ok(ScriptAction::Read { lba: 0, blocks: 2 }));
        assert_eq!(
            "write:0x10:0xE5:1".parse::<ScriptAction>(),
            Ok(ScriptAction::Write {
                lba: 0x10,
                fill: 0xE5,
                blocks: 1
            })
        );
        assert_eq!("FORMAT:33".parse::<ScriptAction>(), Ok(ScriptAction::Format { lba: 33 }));
        assert_eq!("sense".parse::<ScriptAction>(), Ok(ScriptAction::Sense));
        assert_eq!("rezero".parse::<ScriptAction>(), Ok(ScriptAction::Rezero));
        assert_eq!("seek:0x1FFFFF".parse::<ScriptAction>(), Ok(ScriptAction::Seek { lba: MAX_LBA }));
    }

    #[test]
    fn reject_bad_actions() {
        assert!("".parse::<ScriptAction>().is_err());
        assert!("eject".parse::<ScriptAction>().is_err());
        assert!("read:0".parse::<ScriptAction>().is_err());
        assert!("read:0:256".parse::<ScriptAction>().is_err());
        assert!("seek:0x200000".parse::<ScriptAction>().is_err());
        assert!("sense:1".parse::<ScriptAction>().is_err());
        assert!("write:1:zz:1".parse::<ScriptAction>().is_err());
    }

    #[test]
    fn display_parses_back() {
        let action = ScriptAction::Write {
            lba: 0x123,
            fill: 0x5A,
            blocks: 3,
        };
        assert_eq!(action.to_string().parse::<ScriptAction>(), Ok(action));
    }
}
