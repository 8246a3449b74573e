use crate::{
    duty::{Channel, DutyCycles, DUTY_OFF},
    errors::SinkError,
};
#[cfg(feature = "controller_gpio")]
use log::error;
use log::{debug, info};
use parking_lot::Mutex;
#[cfg(feature = "controller_gpio")]
use rppal::gpio::{Gpio, OutputPin};
use std::sync::Arc;

/// Three PWM channels driving one RGB LED.
pub trait PwmSink: Send {
    /// Start every channel at the given duty cycle.
    fn start(&mut self, duty: DutyCycles) -> Result<(), SinkError>;

    /// Change the duty cycle of one channel, in percent.
    fn change_duty(&mut self, channel: Channel, duty: f64) -> Result<(), SinkError>;

    /// Stop every channel and release the hardware.
    /// Calling it again must be harmless.
    fn stop(&mut self);

    fn change_all(&mut self, duty: DutyCycles) -> Result<(), SinkError> {
        for &channel in Channel::ALL.iter() {
            self.change_duty(channel, duty[channel])?;
        }
        Ok(())
    }
}

fn check_duty(channel: Channel, duty: f64) -> Result<(), SinkError> {
    if (0.0..=DUTY_OFF).contains(&duty) {
        Ok(())
    } else {
        Err(SinkError::OutOfRange {
            channel: channel.name(),
            duty,
        })
    }
}

// GPIO Controller
// <editor-fold>
#[cfg(feature = "controller_gpio")]
pub struct ControllerGpio {
    freq: f64,
    pins: [OutputPin; 3],
    stopped: bool,
}

#[cfg(feature = "controller_gpio")]
impl ControllerGpio {
    pub fn new(freq: f64, red: u8, green: u8, blue: u8) -> Result<Self, SinkError> {
        let gpio = Gpio::new()?;
        let red = gpio.get(red)?.into_output();
        let green = gpio.get(green)?.into_output();
        let blue = gpio.get(blue)?.into_output();
        let pins = [red, green, blue];

        info!(
            "GPIO PWM on pins {}/{}/{} at {} Hz",
            pins[0].pin(),
            pins[1].pin(),
            pins[2].pin(),
            freq
        );

        Ok(Self {
            freq,
            pins,
            stopped: false,
        })
    }

    #[inline]
    fn pin(&mut self, channel: Channel) -> &mut OutputPin {
        match channel {
            Channel::Red => &mut self.pins[0],
            Channel::Green => &mut self.pins[1],
            Channel::Blue => &mut self.pins[2],
        }
    }
}

#[cfg(feature = "controller_gpio")]
impl PwmSink for ControllerGpio {
    fn start(&mut self, duty: DutyCycles) -> Result<(), SinkError> {
        self.stopped = false;
        self.change_all(duty)
    }

    fn change_duty(&mut self, channel: Channel, duty: f64) -> Result<(), SinkError> {
        if self.stopped {
            return Err(SinkError::Stopped);
        }
        check_duty(channel, duty)?;

        // rppal wants a ratio, not a percentage
        let freq = self.freq;
        self.pin(channel).set_pwm_frequency(freq, duty / 100.0)?;
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        for pin in self.pins.iter_mut() {
            if let Err(err) = pin.clear_pwm() {
                error!("Failed to stop PWM on pin {}: {}", pin.pin(), err);
            }
            // Common anode, high is dark
            pin.set_high();
        }
        info!("GPIO PWM stopped");
    }
}

#[cfg(feature = "controller_gpio")]
impl Drop for ControllerGpio {
    fn drop(&mut self) {
        self.stop();
    }
}
// </editor-fold>

// Memory Controller
// <editor-fold>
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryChannels {
    pub duty: DutyCycles,
    pub running: bool,
    pub starts: usize,
    pub stops: usize,
    /// Every successful `change_duty`, in order.
    pub writes: Vec<(Channel, f64)>,
    pub fail_writes: bool,
}

/// Observer side of a [`ControllerMemory`], usable after the sink has been
/// handed to a controller.
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    inner: Arc<Mutex<MemoryChannels>>,
}

impl MemoryProbe {
    pub fn duty(&self) -> DutyCycles {
        self.inner.lock().duty
    }

    pub fn channels(&self) -> MemoryChannels {
        self.inner.lock().clone()
    }

    /// Make every following write fail, as an unplugged driver would.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }
}

/// A sink that only remembers what it was told, for hosts without GPIO.
pub struct ControllerMemory {
    inner: Arc<Mutex<MemoryChannels>>,
}

impl ControllerMemory {
    pub fn new() -> (Self, MemoryProbe) {
        let inner = Arc::new(Mutex::new(MemoryChannels {
            duty: DutyCycles::OFF,
            running: false,
            starts: 0,
            stops: 0,
            writes: Vec::new(),
            fail_writes: false,
        }));

        let probe = MemoryProbe {
            inner: inner.clone(),
        };
        (Self { inner }, probe)
    }
}

impl PwmSink for ControllerMemory {
    fn start(&mut self, duty: DutyCycles) -> Result<(), SinkError> {
        {
            let mut inner = self.inner.lock();
            inner.running = true;
            inner.starts += 1;
        }
        self.change_all(duty)
    }

    fn change_duty(&mut self, channel: Channel, duty: f64) -> Result<(), SinkError> {
        let mut inner = self.inner.lock();
        if !inner.running {
            return Err(SinkError::Stopped);
        }
        if inner.fail_writes {
            return Err(SinkError::Rejected(channel.name()));
        }
        check_duty(channel, duty)?;

        debug!("PWM {} <- {:.2}%", channel.name(), duty);
        inner.duty[channel] = duty;
        inner.writes.push((channel, duty));
        Ok(())
    }

    fn stop(&mut self) {
        let mut inner = self.inner.lock();
        if !inner.running {
            return;
        }
        inner.running = false;
        inner.stops += 1;
        inner.duty = DutyCycles::OFF;
        info!("Memory PWM stopped");
    }
}

impl Drop for ControllerMemory {
    fn drop(&mut self) {
        self.stop();
    }
}
// </editor-fold>
