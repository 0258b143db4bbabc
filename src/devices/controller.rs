//! Device main loop.
//!
//! Ties the supervisor bus, the command dispatcher and the fail-safe
//! together. Construction is handled by the `ports` module, since it
//! depends on board specific parts.
use crate::{
    devices::{
        bus::{Phase, Transport},
        dispatcher::{Dispatcher, Identity, Plant},
        fail_safe::FailSafe,
        traits::BusUart,
        updater::{FirmwareUpdater, StartupOutcome},
    },
    hal::{flash, gpio::OutputPin, interrupt::Interrupts, time::Now, watchdog::Watchdog},
};

pub struct Controller<'s, U, P, C, PL, F, I, W>
where
    U: BusUart,
    P: OutputPin,
    C: Now,
    PL: Plant,
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    transport: Transport<'s, U, P, C>,
    dispatcher: Dispatcher<PL, FirmwareUpdater<F, I, W>>,
    fail_safe: FailSafe,
    startup: StartupOutcome,
}

impl<'s, U, P, C, PL, F, I, W> Controller<'s, U, P, C, PL, F, I, W>
where
    U: BusUart,
    P: OutputPin,
    C: Now,
    PL: Plant,
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    /// Checks (and if needed repairs) the firmware images, then assembles
    /// the controller. Must be called before interrupts are enabled, since
    /// repairing the primary image ends in a reset.
    pub fn new(
        transport: Transport<'s, U, P, C>,
        plant: PL,
        mut updater: FirmwareUpdater<F, I, W>,
        identity: Identity,
    ) -> Self {
        let startup = updater.startup_check();
        info!("Startup check complete: {:?}", startup);
        Self {
            transport,
            dispatcher: Dispatcher::new(plant, updater, identity),
            fail_safe: FailSafe::new(),
            startup,
        }
    }

    /// One main loop iteration: serve at most one frame, then re-evaluate
    /// the supervisor link.
    pub fn poll(&mut self) {
        self.dispatcher.updater_mut().pat_watchdog();
        if let Some(request) = self.transport.poll() {
            self.dispatcher.dispatch(request);
        }
        let link_lost = self.transport.link_lost();
        self.fail_safe.update(link_lost, self.dispatcher.plant_mut());
    }

    pub fn run(mut self) -> ! {
        info!("-- Controller running --");
        loop {
            self.poll();
        }
    }

    pub fn startup(&self) -> StartupOutcome { self.startup }

    pub fn dispatcher(&self) -> &Dispatcher<PL, FirmwareUpdater<F, I, W>> { &self.dispatcher }

    pub fn fail_safe(&self) -> &FailSafe { &self.fail_safe }

    pub fn bus_phase(&self) -> Phase { self.transport.phase() }
}
