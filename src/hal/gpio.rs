//! GPIO activity indicator.
//!
//! The receive path pulses a latch for every non-terminator byte. It is a
//! diagnostic only and carries no protocol meaning.

/// Per-byte side effect in the receive path. Must not block.
pub trait ActivityIndicator {
    fn on_byte(&mut self);
}

/// No indicator fitted.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoActivity;

impl ActivityIndicator for NoActivity {
    #[inline]
    fn on_byte(&mut self) {}
}

/// Counts pulses instead of driving a pin.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActivityCounter {
    pub pulses: u32,
}

impl ActivityIndicator for ActivityCounter {
    #[inline]
    fn on_byte(&mut self) {
        self.pulses = self.pulses.wrapping_add(1);
    }
}

/// Output pin toggled on every byte.
#[cfg(target_os = "espidf")]
pub struct ActivityPin<'d> {
    pin: esp_idf_svc::hal::gpio::PinDriver<
        'd,
        esp_idf_svc::hal::gpio::AnyOutputPin,
        esp_idf_svc::hal::gpio::Output,
    >,
}

#[cfg(target_os = "espidf")]
impl<'d> ActivityPin<'d> {
    pub fn new(
        pin: esp_idf_svc::hal::gpio::AnyOutputPin,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        Ok(Self {
            pin: esp_idf_svc::hal::gpio::PinDriver::output(pin)?,
        })
    }
}

#[cfg(target_os = "espidf")]
impl ActivityIndicator for ActivityPin<'_> {
    #[inline]
    fn on_byte(&mut self) {
        let _ = self.pin.toggle();
    }
}
