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

    devices::hdc::req_timer.rs

    A single-shot timer used to model the delayed assertion of the SASI REQ
    line. Only one event may be pending; adjusting the timer replaces it.

*/

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ReqTimer {
    remaining_ns: Option<f64>,
}

impl ReqTimer {
    pub fn new() -> Self {
        Self { remaining_ns: None }
    }

    /// Schedule the timer to fire after `delay_ns`, replacing any pending event.
    pub fn adjust(&mut self, delay_ns: f64) {
        self.remaining_ns = Some(delay_ns.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.remaining_ns = None;
    }

    #[inline]
    pub fn pending(&self) -> bool {
        self.remaining_ns.is_some()
    }

    /// Time left before the pending event fires, if any.
    #[inline]
    pub fn remaining_ns(&self) -> Option<f64> {
        self.remaining_ns
    }

    /// Advance the timer by `elapsed_ns`. Returns true if the pending event fired.
    pub fn run(&mut self, elapsed_ns: f64) -> bool {
        match self.remaining_ns {
            Some(remaining) => {
                let remaining = remaining - elapsed_ns;
                if remaining <= 0.0 {
                    self.remaining_ns = None;
                    true
                }
                else {
                    self.remaining_ns = Some(remaining);
                    false
                }
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_delay() {
        let mut timer = ReqTimer::new();
        timer.adjust(450.0);
        assert!(!timer.run(200.0));
        assert!(!timer.run(200.0));
        assert!(timer.run(50.0));
        assert!(!timer.pending());
        assert!(!timer.run(1000.0));
    }

    #[test]
    fn adjust_replaces_pending_event() {
        let mut timer = ReqTimer::new();
        timer.adjust(45.0);
        assert!(!timer.run(40.0));
        timer.adjust(450.0);
        assert!(!timer.run(40.0));
        assert_eq!(timer.remaining_ns(), Some(410.0));
        assert!(timer.run(410.0));
    }

    #[test]
    fn cancel_drops_event() {
        let mut timer = ReqTimer::new();
        timer.adjust(10.0);
        timer.cancel();
        assert!(!timer.run(100.0));
    }
}
