use env_logger::Env;
use log::{debug, info};
#[cfg(feature = "controller_gpio")]
use nightlight_server::led_controllers::ControllerGpio;
use nightlight_server::{
    app::{App, AppEvent},
    controller::ColorController,
    led_controllers::{ControllerMemory, PwmSink},
    LedType, Opt,
};
use structopt::StructOpt;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting...");

    // Parse cmdline
    let opt: Opt = Opt::from_args();

    match opt.led_type {
        LedType::Gpio => {
            info!("Choosed led type GPIO");
            #[cfg(not(feature = "controller_gpio"))]
            anyhow::bail!("LED type GPIO is not supported by this build !");
            #[cfg(feature = "controller_gpio")]
            return run_app(
                opt,
                ControllerGpio::new(opt.pwm_freq, opt.pin_red, opt.pin_green, opt.pin_blue)?,
            );
        }
        LedType::Memory => {
            info!("Choosed led type memory, no hardware will be driven");
            let (sink, _probe) = ControllerMemory::new();
            run_app(opt, sink)
        }
    }
}

fn run_app<S: PwmSink + 'static>(opt: Opt, sink: S) -> anyhow::Result<()> {
    if opt.reset {
        debug!("Reset and exit");
        let controller = ColorController::new(sink)?;
        controller.shutdown();
        return Ok(());
    }

    let mut app = App::new(&opt, sink)?;

    let messenger = app.messenger();
    ctrlc::set_handler(move || {
        if messenger.send(AppEvent::Exit).is_err() {
            eprintln!("Already exiting");
        }
    })?;

    let res = app.run();
    app.stop();
    res
}
