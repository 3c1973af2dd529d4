//! DMC (Delta Modulation Channel) - 1-bit delta-encoded sample playback.
//!
//! The DMC channel plays 1-bit delta-encoded samples from CPU memory via DMA.
//! Unlike other channels, it reads sample data directly from memory, which
//! stalls the CPU for 1-4 cycles per byte fetched.
//!
//! This channel does not perform the memory read itself: the bus layer polls
//! [`Dmc::needs_sample`] and, when true, reads the byte at [`Dmc::sample_addr`]
//! and hands it back via [`Dmc::fill_sample_buffer`]. This keeps the APU free
//! of any dependency on the memory map, mirroring how the mapper CHR access
//! is threaded through closures rather than owned directly.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// DMC rate table for NTSC (CPU cycles per timer tick).
const DMC_RATE_NTSC: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// DMC channel implementation.
///
/// # Registers
///
/// - `$4010`: IRQ enable, Loop flag, Rate index
/// - `$4011`: Direct load (7-bit output level)
/// - `$4012`: Sample address = $C000 + (A × $40)
/// - `$4013`: Sample length = (L × $10) + 1 bytes
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dmc {
    irq_enabled: bool,
    loop_enabled: bool,
    rate_index: u8,

    sample_address_reg: u8,
    sample_length_reg: u8,
    current_address: u16,
    bytes_remaining: u16,

    sample_buffer: u8,
    sample_buffer_empty: bool,
    bits_remaining: u8,
    output_level: u8,

    timer: u16,
    timer_counter: u16,

    irq_flag: bool,
    enabled: bool,
}

impl Dmc {
    /// Create a new DMC channel (NTSC timing).
    #[must_use]
    pub fn new() -> Self {
        let initial_timer = DMC_RATE_NTSC[0];

        Self {
            irq_enabled: false,
            loop_enabled: false,
            rate_index: 0,
            sample_address_reg: 0,
            sample_length_reg: 0,
            current_address: 0xC000,
            bytes_remaining: 0,
            sample_buffer: 0,
            sample_buffer_empty: true,
            bits_remaining: 0,
            output_level: 0,
            timer: initial_timer,
            timer_counter: initial_timer,
            irq_flag: false,
            enabled: false,
        }
    }

    /// Write to $4010: IL-- RRRR.
    pub fn write_ctrl(&mut self, value: u8) {
        self.irq_enabled = (value & 0x80) != 0;
        self.loop_enabled = (value & 0x40) != 0;
        self.rate_index = value & 0x0F;
        self.timer = DMC_RATE_NTSC[self.rate_index as usize];

        if !self.irq_enabled {
            self.irq_flag = false;
        }
    }

    /// Write to $4011: direct load of the 7-bit output level.
    pub fn write_direct_load(&mut self, value: u8) {
        self.output_level = value & 0x7F;
    }

    /// Write to $4012: sample address = $C000 + (A × 64).
    pub fn write_sample_address(&mut self, value: u8) {
        self.sample_address_reg = value;
    }

    /// Write to $4013: sample length = (L × 16) + 1 bytes.
    pub fn write_sample_length(&mut self, value: u8) {
        self.sample_length_reg = value;
    }

    /// Set channel enable state (called from $4015 write).
    ///
    /// When enabled with no bytes remaining, restarts sample playback.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;

        if enabled {
            if self.bytes_remaining == 0 {
                self.restart_sample();
            }
        } else {
            self.bytes_remaining = 0;
        }
    }

    /// Clock the timer (called every APU cycle).
    ///
    /// Advances the output shifter when the timer reaches zero. Does not
    /// perform any memory access; the bus layer supplies sample bytes via
    /// [`Self::fill_sample_buffer`] in response to [`Self::needs_sample`].
    pub fn clock_timer(&mut self) {
        if self.timer_counter == 0 {
            self.timer_counter = self.timer;

            if self.bits_remaining > 0 {
                self.clock_output_shifter();
            }
        } else {
            self.timer_counter -= 1;
        }
    }

    fn clock_output_shifter(&mut self) {
        if self.sample_buffer_empty {
            if self.output_level >= 2 {
                self.output_level -= 2;
            }
        } else {
            if (self.sample_buffer & 1) == 1 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }

            self.sample_buffer >>= 1;
        }

        self.bits_remaining -= 1;
        if self.bits_remaining == 0 {
            self.sample_buffer_empty = true;
        }
    }

    /// True when the sample buffer is empty and more sample bytes remain.
    /// The bus layer should read [`Self::sample_addr`] and call
    /// [`Self::fill_sample_buffer`] in response, stalling the CPU.
    #[must_use]
    pub fn needs_sample(&self) -> bool {
        self.sample_buffer_empty && self.bytes_remaining > 0
    }

    /// The CPU address the next sample byte should be read from.
    #[must_use]
    pub fn sample_addr(&self) -> u16 {
        self.current_address
    }

    /// Supply a sample byte fetched from `sample_addr()`.
    ///
    /// Advances the read address (wrapping $FFFF to $8000, not $0000),
    /// decrements the remaining byte count, and handles sample completion
    /// (loop restart or IRQ flag).
    pub fn fill_sample_buffer(&mut self, sample: u8) {
        self.sample_buffer = sample;
        self.sample_buffer_empty = false;
        self.bits_remaining = 8;

        self.current_address = if self.current_address == 0xFFFF {
            0x8000
        } else {
            self.current_address + 1
        };

        self.bytes_remaining -= 1;

        if self.bytes_remaining == 0 {
            if self.loop_enabled {
                self.restart_sample();
            } else if self.irq_enabled {
                self.irq_flag = true;
            }
        }
    }

    fn restart_sample(&mut self) {
        self.current_address = 0xC000 | (u16::from(self.sample_address_reg) << 6);
        self.bytes_remaining = (u16::from(self.sample_length_reg) << 4) | 1;
    }

    /// Get current output value (0-127). Zero if channel is disabled.
    #[must_use]
    pub fn output(&self) -> u8 {
        if self.enabled {
            self.output_level
        } else {
            0
        }
    }

    /// Check if the DMC channel is active (bytes remaining > 0), for $4015.
    #[must_use]
    pub fn active(&self) -> bool {
        self.bytes_remaining > 0
    }

    /// Check if the DMC IRQ flag is set.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_flag
    }

    /// Clear the DMC IRQ flag (called when $4015 is read).
    pub fn clear_irq(&mut self) {
        self.irq_flag = false;
    }

    /// Bytes remaining in the current sample.
    #[must_use]
    pub fn bytes_remaining(&self) -> u16 {
        self.bytes_remaining
    }
}

impl Default for Dmc {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dmc_new() {
        let dmc = Dmc::new();
        assert_eq!(dmc.output(), 0);
        assert!(!dmc.active());
        assert!(!dmc.irq_pending());
    }

    #[test]
    fn test_direct_load() {
        let mut dmc = Dmc::new();
        dmc.set_enabled(true);

        dmc.write_direct_load(0x7F);
        assert_eq!(dmc.output(), 127);

        // Only 7 bits are used.
        dmc.write_direct_load(0xFF);
        assert_eq!(dmc.output(), 127);
    }

    #[test]
    fn test_rate_index() {
        let mut dmc = Dmc::new();

        dmc.write_ctrl(0x0F);
        assert_eq!(dmc.timer, DMC_RATE_NTSC[15]);

        dmc.write_ctrl(0x00);
        assert_eq!(dmc.timer, DMC_RATE_NTSC[0]);
    }

    #[test]
    fn test_irq_enable_clears_flag() {
        let mut dmc = Dmc::new();
        dmc.irq_flag = true;
        assert!(dmc.irq_pending());

        dmc.write_ctrl(0x00); // IRQ disabled
        assert!(!dmc.irq_pending());
    }

    #[test]
    fn test_sample_address_calculation() {
        let mut dmc = Dmc::new();

        dmc.write_sample_address(0x00);
        dmc.restart_sample();
        assert_eq!(dmc.sample_addr(), 0xC000);

        dmc.write_sample_address(0x01);
        dmc.restart_sample();
        assert_eq!(dmc.sample_addr(), 0xC040);

        dmc.write_sample_address(0xFF);
        dmc.restart_sample();
        assert_eq!(dmc.sample_addr(), 0xFFC0);
    }

    #[test]
    fn test_sample_length_calculation() {
        let mut dmc = Dmc::new();

        dmc.write_sample_length(0x00);
        dmc.restart_sample();
        assert_eq!(dmc.bytes_remaining(), 1);

        dmc.write_sample_length(0x01);
        dmc.restart_sample();
        assert_eq!(dmc.bytes_remaining(), 17);

        dmc.write_sample_length(0xFF);
        dmc.restart_sample();
        assert_eq!(dmc.bytes_remaining(), 4081);
    }

    #[test]
    fn test_needs_sample() {
        let mut dmc = Dmc::new();
        assert!(!dmc.needs_sample());

        dmc.set_enabled(true);
        assert!(dmc.needs_sample());

        dmc.fill_sample_buffer(0xFF);
        assert!(!dmc.needs_sample());
    }

    #[test]
    fn test_address_wrap() {
        let mut dmc = Dmc::new();
        dmc.current_address = 0xFFFF;
        dmc.bytes_remaining = 2;
        dmc.enabled = true;

        dmc.fill_sample_buffer(0xAA);
        assert_eq!(dmc.sample_addr(), 0x8000);
    }

    #[test]
    fn test_sample_completion_with_irq() {
        let mut dmc = Dmc::new();
        dmc.write_ctrl(0x80); // IRQ enabled, no loop
        dmc.bytes_remaining = 1;
        dmc.enabled = true;

        dmc.fill_sample_buffer(0x00);
        assert_eq!(dmc.bytes_remaining(), 0);
        assert!(dmc.irq_pending());
    }

    #[test]
    fn test_sample_completion_with_loop() {
        let mut dmc = Dmc::new();
        dmc.write_ctrl(0x40); // Loop enabled, no IRQ
        dmc.write_sample_address(0x01);
        dmc.write_sample_length(0x01);
        dmc.bytes_remaining = 1;
        dmc.current_address = 0xD000;
        dmc.enabled = true;

        dmc.fill_sample_buffer(0x00);
        assert_eq!(dmc.bytes_remaining(), 17);
        assert_eq!(dmc.sample_addr(), 0xC040);
        assert!(!dmc.irq_pending());
    }

    #[test]
    fn test_enable_starts_sample() {
        let mut dmc = Dmc::new();
        dmc.write_sample_address(0x00);
        dmc.write_sample_length(0x10);
        assert_eq!(dmc.bytes_remaining(), 0);

        dmc.set_enabled(true);
        assert_eq!(dmc.bytes_remaining(), 257);
        assert_eq!(dmc.sample_addr(), 0xC000);
    }

    #[test]
    fn test_disable_clears_bytes_remaining() {
        let mut dmc = Dmc::new();
        dmc.set_enabled(true);
        dmc.bytes_remaining = 100;

        dmc.set_enabled(false);
        assert_eq!(dmc.bytes_remaining(), 0);
    }

    #[test]
    fn test_timer_clocking() {
        let mut dmc = Dmc::new();
        dmc.write_ctrl(0x0F); // Rate 15 (fastest, 54 cycles)
        dmc.timer_counter = 2;
        dmc.bits_remaining = 0;

        dmc.clock_timer();
        assert_eq!(dmc.timer_counter, 1);

        dmc.clock_timer();
        assert_eq!(dmc.timer_counter, 0);

        dmc.clock_timer();
        assert_eq!(dmc.timer_counter, 54);
    }

    #[test]
    fn test_output_disabled() {
        let mut dmc = Dmc::new();
        dmc.output_level = 64;

        assert_eq!(dmc.output(), 0);

        dmc.set_enabled(true);
        assert_eq!(dmc.output(), 64);
    }

    #[test]
    fn test_clear_irq() {
        let mut dmc = Dmc::new();
        dmc.irq_flag = true;

        dmc.clear_irq();
        assert!(!dmc.irq_pending());
    }

    #[test]
    fn test_active() {
        let mut dmc = Dmc::new();
        assert!(!dmc.active());

        dmc.bytes_remaining = 10;
        assert!(dmc.active());

        dmc.bytes_remaining = 0;
        assert!(!dmc.active());
    }
}
