use crate::{
    duty::{self, DutyCycles},
    errors::SinkError,
    led_controllers::PwmSink,
};
use log::{debug, info};
use nightlight_common::{packets::LedStatus, Rgb};
use parking_lot::Mutex;

/// Everything a request can change, plus what was last sent to the sink.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LedState {
    pub enabled: bool,
    pub night_mode: bool,
    /// Last color applied while enabled.
    pub color: Option<Rgb>,
    pub duty: DutyCycles,
}

impl Default for LedState {
    fn default() -> Self {
        Self {
            enabled: true,
            night_mode: false,
            color: None,
            duty: DutyCycles::OFF,
        }
    }
}

impl From<LedState> for LedStatus {
    fn from(state: LedState) -> Self {
        Self {
            enabled: state.enabled,
            night: state.night_mode,
            color: state.color,
            duty: state.duty.to_array(),
        }
    }
}

struct Inner<S> {
    state: LedState,
    sink: S,
}

/// Owns the LED state and the sink that displays it.
///
/// One lock covers both, and it is held for the whole of a command including
/// the hardware writes, so the three channels always show the same request.
pub struct ColorController<S: PwmSink> {
    inner: Mutex<Inner<S>>,
}

impl<S: PwmSink> ColorController<S> {
    /// Takes ownership of the sink and starts it with every channel off.
    pub fn new(mut sink: S) -> Result<Self, SinkError> {
        sink.start(DutyCycles::OFF)?;
        info!("LED output started, all channels off");

        Ok(Self {
            inner: Mutex::new(Inner {
                state: LedState::default(),
                sink,
            }),
        })
    }

    pub fn apply(&self, enabled: bool, color: Rgb) -> Result<DutyCycles, SinkError> {
        let mut inner = self.inner.lock();
        let Inner { state, sink } = &mut *inner;

        state.enabled = enabled;
        let duty = duty::compute(enabled, state.night_mode, color);
        if enabled {
            state.color = Some(color);
        }
        debug!(
            "Apply enabled={} color={} night={} -> {:?}",
            enabled, color, state.night_mode, duty
        );

        sink.change_all(duty)?;
        state.duty = duty;

        Ok(duty)
    }

    /// Only stores the flag, the next `apply` picks it up.
    pub fn set_night(&self, night: bool) {
        let mut inner = self.inner.lock();
        inner.state.night_mode = night;
        debug!("Night mode {}", if night { "on" } else { "off" });
    }

    pub fn snapshot(&self) -> LedState {
        self.inner.lock().state
    }

    pub fn shutdown(&self) {
        self.inner.lock().sink.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        duty::Channel,
        led_controllers::{ControllerMemory, MemoryProbe},
    };
    use std::{sync::Arc, thread};

    fn controller() -> (ColorController<ControllerMemory>, MemoryProbe) {
        let (sink, probe) = ControllerMemory::new();
        (ColorController::new(sink).unwrap(), probe)
    }

    fn assert_close(actual: DutyCycles, expected: [f64; 3]) {
        for (a, e) in actual.to_array().iter().zip(expected.iter()) {
            assert!((a - e).abs() < 0.01, "expected {:?} got {:?}", expected, actual);
        }
    }

    #[test]
    fn starts_off() {
        let (controller, probe) = controller();
        assert_eq!(probe.duty(), DutyCycles::OFF);
        assert_eq!(probe.channels().starts, 1);

        let state = controller.snapshot();
        assert!(state.enabled);
        assert!(!state.night_mode);
        assert_eq!(state.color, None);
    }

    #[test]
    fn disabled_ignores_color_and_night() {
        let (controller, probe) = controller();
        controller.apply(true, Rgb::new(10, 20, 30)).unwrap();
        controller.set_night(true);

        let duty = controller.apply(false, Rgb::WHITE).unwrap();
        assert_eq!(duty, DutyCycles::OFF);
        assert_eq!(probe.duty(), DutyCycles::OFF);

        let state = controller.snapshot();
        assert!(!state.enabled);
        assert_eq!(state.color, Some(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn white_without_night_is_full_on() {
        let (controller, probe) = controller();
        controller.apply(true, Rgb::WHITE).unwrap();
        assert_eq!(probe.duty(), DutyCycles::uniform(0.0));
    }

    #[test]
    fn white_with_night_is_a_third() {
        let (controller, probe) = controller();
        controller.set_night(true);
        controller.apply(true, Rgb::WHITE).unwrap();
        assert_close(probe.duty(), [66.67, 66.67, 66.67]);
    }

    #[test]
    fn night_toggle_alone_changes_nothing() {
        let (controller, probe) = controller();
        controller.apply(true, Rgb::new(0, 255, 0)).unwrap();
        let writes = probe.channels().writes.len();

        controller.set_night(true);
        assert_eq!(probe.duty().to_array(), [100.0, 0.0, 100.0]);
        assert_eq!(probe.channels().writes.len(), writes);
        assert!(controller.snapshot().night_mode);
    }

    #[test]
    fn night_survives_disable() {
        let (controller, probe) = controller();
        controller.set_night(true);
        controller.apply(false, Rgb::WHITE).unwrap();
        controller.apply(true, Rgb::WHITE).unwrap();
        assert_close(probe.duty(), [66.67, 66.67, 66.67]);
    }

    #[test]
    fn sink_failure_is_returned() {
        let (controller, probe) = controller();
        probe.fail_writes(true);
        assert!(matches!(
            controller.apply(true, Rgb::WHITE),
            Err(SinkError::Rejected("red"))
        ));
    }

    #[test]
    fn failed_write_keeps_reported_duty() {
        let (controller, probe) = controller();
        controller.apply(true, Rgb::new(0, 255, 0)).unwrap();

        probe.fail_writes(true);
        assert!(controller.apply(true, Rgb::WHITE).is_err());
        assert_eq!(controller.snapshot().duty.to_array(), [100.0, 0.0, 100.0]);
    }

    #[test]
    fn apply_after_shutdown_fails() {
        let (controller, probe) = controller();
        controller.shutdown();
        controller.shutdown();
        assert_eq!(probe.channels().stops, 1);
        assert!(matches!(
            controller.apply(true, Rgb::WHITE),
            Err(SinkError::Stopped)
        ));
    }

    #[test]
    fn concurrent_applies_never_mix_channels() {
        let (controller, probe) = controller();
        let controller = Arc::new(controller);

        let colors: Vec<Rgb> = (0..32u8)
            .map(|i| Rgb::new(i * 7, 255 - i * 5, i * 3))
            .collect();

        let handles: Vec<_> = colors
            .iter()
            .copied()
            .map(|color| {
                let controller = controller.clone();
                thread::spawn(move || {
                    for _ in 0..20 {
                        controller.apply(true, color).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected: Vec<[f64; 3]> = colors
            .iter()
            .map(|&color| DutyCycles::from_color(color).to_array())
            .collect();

        assert!(expected.contains(&probe.duty().to_array()));

        // Skip the triple written by `start`
        let writes = probe.channels().writes;
        assert_eq!(writes.len(), 3 + 32 * 20 * 3);
        for triple in writes[3..].chunks(3) {
            let channels: Vec<_> = triple.iter().map(|(channel, _)| *channel).collect();
            assert_eq!(channels, Channel::ALL.to_vec());

            let values = [triple[0].1, triple[1].1, triple[2].1];
            assert!(expected.contains(&values), "mixed triple {:?}", values);
        }
    }
}
