use nightlight_common::Rgb;
use nightlight_server::{
    controller::ColorController,
    duty::{self, Channel, DutyCycles},
    led_controllers::ControllerMemory,
};
use proptest::prelude::*;

fn rgb() -> impl Strategy<Value = Rgb> {
    any::<[u8; 3]>().prop_map(Rgb::from)
}

proptest! {
    #[test]
    fn duty_stays_in_range_and_decreases(v in 0u8..255) {
        let here = duty::duty_for(v);
        let next = duty::duty_for(v + 1);
        prop_assert!((0.0..=100.0).contains(&here));
        prop_assert!(next < here);
    }

    #[test]
    fn disabled_is_off_whatever_came_before(
        before in rgb(),
        requested in rgb(),
        night in any::<bool>(),
    ) {
        let (sink, probe) = ControllerMemory::new();
        let controller = ColorController::new(sink).unwrap();
        controller.set_night(night);
        controller.apply(true, before).unwrap();

        controller.apply(false, requested).unwrap();
        prop_assert_eq!(probe.duty(), DutyCycles::OFF);
    }

    #[test]
    fn night_never_brightens(color in rgb()) {
        let day = duty::compute(true, false, color);
        let night = duty::compute(true, true, color);
        for &channel in Channel::ALL.iter() {
            prop_assert!(night[channel] >= day[channel]);
            prop_assert!((0.0..=100.0).contains(&night[channel]));
        }
    }

    #[test]
    fn night_toggle_never_touches_the_sink(color in rgb(), night in any::<bool>()) {
        let (sink, probe) = ControllerMemory::new();
        let controller = ColorController::new(sink).unwrap();
        controller.apply(true, color).unwrap();
        let before = probe.channels();

        controller.set_night(night);
        prop_assert_eq!(probe.channels(), before);
    }
}
