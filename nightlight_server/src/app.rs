use crate::{
    controller::ColorController,
    errors::SinkError,
    led_controllers::PwmSink,
    net::{self, NetHandler},
    Opt,
};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::{
    net::SocketAddr,
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
    time::Duration,
};

const ACCEPT_POLL_PERIOD: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub enum AppEvent {
    /// Stop serving and release the LED.
    Exit,
    /// The LED could not be driven, nothing left to serve.
    Fatal(SinkError),
}

pub struct App<S: PwmSink + 'static> {
    controller: Arc<ColorController<S>>,
    net: NetHandler,

    events: Receiver<AppEvent>,
    messenger: Sender<AppEvent>,
    connections: usize,
}

impl<S: PwmSink + 'static> App<S> {
    /// Starts the LED at off before binding, so no request can race startup.
    pub fn new(opt: &Opt, sink: S) -> Result<Self> {
        let controller = Arc::new(ColorController::new(sink)?);
        let net = NetHandler::new(opt.address, opt.port)
            .with_context(|| format!("Failed to bind {}:{}", opt.address, opt.port))?;

        let (messenger, events) = mpsc::channel();

        Ok(Self {
            controller,
            net,
            events,
            messenger,
            connections: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.net.local_addr()?)
    }

    pub fn controller(&self) -> &Arc<ColorController<S>> {
        &self.controller
    }

    /// Handle to stop the app from another thread or a signal handler.
    pub fn messenger(&self) -> Sender<AppEvent> {
        self.messenger.clone()
    }

    /// Serves requests until an `AppEvent` arrives. "Listening on" is logged
    /// here rather than in `new`, so it comes after any signal handler setup.
    pub fn run(&mut self) -> Result<()> {
        info!("Listening on {}", self.net.local_addr()?);
        loop {
            match self.events.try_recv() {
                Ok(AppEvent::Exit) => {
                    info!("Exit requested");
                    return Ok(());
                }
                Ok(AppEvent::Fatal(err)) => {
                    return Err(err).context("LED output failed");
                }
                // We hold a sender ourselves, it can't disconnect
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }

            match self.net.try_accept() {
                Ok(Some(stream)) => self.spawn_connection(stream)?,
                Ok(None) => thread::sleep(ACCEPT_POLL_PERIOD),
                Err(err) if net::is_transient_accept_error(&err) => {
                    warn!("Accept failed, still listening: {}", err);
                    thread::sleep(ACCEPT_POLL_PERIOD);
                }
                Err(err) => return Err(err).context("Listener failed"),
            }
        }
    }

    fn spawn_connection(&mut self, stream: std::net::TcpStream) -> Result<()> {
        self.connections += 1;
        let controller = self.controller.clone();
        let messenger = self.messenger.clone();

        thread::Builder::new()
            .name(format!("Connection {}", self.connections))
            .spawn(move || {
                if let Err(err) = net::handle_connection(&*controller, stream) {
                    error!("Failed to drive the LED: {}", err);
                    // The app may already be gone
                    let _ = messenger.send(AppEvent::Fatal(err));
                }
            })
            .context("Failed to spawn connection thread")?;
        debug!("Spawned connection thread {}", self.connections);

        Ok(())
    }

    pub fn stop(self) {
        self.controller.shutdown();
        info!("LED released");
    }
}

impl<S: PwmSink + 'static> Drop for App<S> {
    fn drop(&mut self) {
        // Harmless after `stop`, needed when `run` bailed out or panicked
        self.controller.shutdown();
    }
}
