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

    bus::mod.rs

    Defines the contract between the host system bus and memory-mapped devices.

*/

pub(crate) const NO_IO_BYTE: u8 = 0xFF; // This is the byte read from an unconnected IO address.

pub const NULL_DELTA_US: DeviceRunTimeUnit = DeviceRunTimeUnit::Microseconds(0.0);

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DeviceRunTimeUnit {
    SystemTicks(u32),
    Microseconds(f64),
}

impl DeviceRunTimeUnit {
    /// Convert this time unit to nanoseconds, given the system clock in MHz.
    pub fn to_ns(&self, sysclock_mhz: f64) -> f64 {
        match *self {
            DeviceRunTimeUnit::SystemTicks(ticks) => {
                if sysclock_mhz > 0.0 {
                    ticks as f64 * 1000.0 / sysclock_mhz
                }
                else {
                    0.0
                }
            }
            DeviceRunTimeUnit::Microseconds(us) => us * 1000.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MemRangeDescriptor {
    pub address: usize,
    pub size: usize,
    pub cycle_cost: u32,
    pub read_only: bool,
    pub priority: u32,
}

impl MemRangeDescriptor {
    pub fn new(address: usize, size: usize, read_only: bool) -> Self {
        Self {
            address,
            size,
            cycle_cost: 0,
            read_only,
            priority: 1,
        }
    }

    #[inline]
    pub fn contains(&self, address: usize) -> bool {
        address >= self.address && address < self.address + self.size
    }
}

/// A device mapped into the host's memory space.
///
/// Accesses carry a delta time that may be used to 'catch up' the device state
/// before the access is serviced, if timing is critical.
pub trait MemoryMappedDevice {
    fn mmio_read_u8(&mut self, address: usize, delta: DeviceRunTimeUnit) -> u8;
    fn mmio_read_u16(&mut self, address: usize, delta: DeviceRunTimeUnit) -> u16;
    /// Read a byte without side effects, for debug display.
    fn mmio_peek_u8(&self, address: usize) -> u8;

    fn mmio_write_u8(&mut self, address: usize, data: u8, delta: DeviceRunTimeUnit);
    fn mmio_write_u16(&mut self, address: usize, data: u16, delta: DeviceRunTimeUnit);

    fn get_mapping(&self) -> Vec<MemRangeDescriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_time_unit_conversion() {
        assert_eq!(DeviceRunTimeUnit::Microseconds(1.5).to_ns(10.0), 1500.0);
        // 10MHz system clock: one tick is 100ns
        assert_eq!(DeviceRunTimeUnit::SystemTicks(5).to_ns(10.0), 500.0);
        assert_eq!(DeviceRunTimeUnit::SystemTicks(5).to_ns(0.0), 0.0);
    }

    #[test]
    fn range_contains() {
        let range = MemRangeDescriptor::new(0xE96000, 0x08, false);
        assert!(range.contains(0xE96000));
        assert!(range.contains(0xE96007));
        assert!(!range.contains(0xE96008));
        assert!(!range.contains(0xE95FFF));
    }
}
