//! Acquisition worker: one thread, one timeline.
//!
//! The worker owns the [`RunController`]. Front ends send [`Command`]s and
//! read [`RunEvent`]s. Commands are only handled between ticks, so a tick
//! that has started always finishes before a stop or config change lands.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::controller::{RunController, RunState, StartOutcome, TickOutcome};
use crate::error::{AppError, AppResult};
use crate::events::{RunEvent, SnapshotSlot, TickReport};

#[derive(Debug, Clone)]
pub enum Command {
    Start,
    Stop,
    Tare,
    UpdateConfig(RunConfig),
    Export(PathBuf),
    Shutdown,
}

enum Flow {
    Continue,
    Exit,
}

pub struct Acquisition {
    commands: Sender<Command>,
    pub events: Receiver<RunEvent>,
    slot: SnapshotSlot,
    handle: Option<JoinHandle<RunController>>,
}

impl Acquisition {
    /// Move the controller onto a new worker thread.
    pub fn spawn(mut controller: RunController) -> AppResult<Self> {
        let (cmd_tx, cmd_rx) = channel();
        let (event_tx, event_rx) = channel();
        let slot = SnapshotSlot::new();
        controller.subscribe(Box::new(slot.clone()));

        let worker = Worker::new(controller, cmd_rx, event_tx, slot.clone());
        let handle = thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || worker.run())
            .map_err(|e| {
                error!(error = %e, "failed to spawn acquisition worker");
                AppError::Spawn(e)
            })?;

        Ok(Self {
            commands: cmd_tx,
            events: event_rx,
            slot,
            handle: Some(handle),
        })
    }

    pub fn send(&self, command: Command) -> AppResult<()> {
        self.commands.send(command).map_err(|_| AppError::WorkerGone)
    }

    pub fn start(&self) -> AppResult<()> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> AppResult<()> {
        self.send(Command::Stop)
    }

    pub fn tare(&self) -> AppResult<()> {
        self.send(Command::Tare)
    }

    pub fn update_config(&self, config: RunConfig) -> AppResult<()> {
        self.send(Command::UpdateConfig(config))
    }

    pub fn export(&self, base: impl Into<PathBuf>) -> AppResult<()> {
        self.send(Command::Export(base.into()))
    }

    /// Most recent tick report, without draining the event channel.
    pub fn latest(&self) -> Option<TickReport> {
        self.slot.latest()
    }

    /// Stop the worker and take the controller back, series intact.
    pub fn shutdown(mut self) -> AppResult<RunController> {
        let _ = self.commands.send(Command::Shutdown);
        let handle = self.handle.take().ok_or(AppError::WorkerGone)?;
        handle.join().map_err(|_| AppError::WorkerPanicked)
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.commands.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}

struct Worker {
    controller: RunController,
    commands: Receiver<Command>,
    events: Sender<RunEvent>,
    slot: SnapshotSlot,
}

impl Worker {
    fn new(
        controller: RunController,
        commands: Receiver<Command>,
        events: Sender<RunEvent>,
        slot: SnapshotSlot,
    ) -> Self {
        Self {
            controller,
            commands,
            events,
            slot,
        }
    }

    fn emit(&self, event: RunEvent) {
        // The front end may have gone away; the run carries on regardless.
        let _ = self.events.send(event);
    }

    fn run(mut self) -> RunController {
        debug!("acquisition worker started");
        loop {
            let next = match self.controller.time_until_tick() {
                None => self.commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
                Some(wait) => self.commands.recv_timeout(wait),
            };

            match next {
                Ok(command) => {
                    if let Flow::Exit = self.handle(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.controller.is_due() {
                self.tick();
            }
        }
        if self.controller.stop() {
            self.emit(RunEvent::StateChanged(RunState::Idle));
        }
        debug!("acquisition worker exiting");
        self.controller
    }

    fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Start => match self.controller.start() {
                Ok(StartOutcome::Started) => {
                    // The previous run's report must not outlive its series.
                    self.slot.clear();
                    self.emit(RunEvent::StateChanged(RunState::Running))
                }
                Ok(StartOutcome::AlreadyRunning) => self.emit(RunEvent::AlreadyRunning),
                Err(e) => self.emit(RunEvent::StartFailed {
                    message: e.to_string(),
                }),
            },
            Command::Stop => {
                if self.controller.stop() {
                    self.emit(RunEvent::StateChanged(RunState::Idle));
                }
            }
            Command::Tare => match self.controller.tare() {
                Ok(()) => self.emit(RunEvent::Tared),
                Err(e) => self.emit(RunEvent::TareFailed {
                    message: e.to_string(),
                }),
            },
            Command::UpdateConfig(config) => match self.controller.update_config(config) {
                Ok(()) => self.emit(RunEvent::ConfigUpdated),
                Err(e) => self.emit(RunEvent::ConfigRejected {
                    message: e.to_string(),
                }),
            },
            Command::Export(base) => match self.controller.export(&base) {
                Ok(paths) => self.emit(RunEvent::Exported(paths)),
                Err(e) => self.emit(RunEvent::ExportFailed {
                    message: e.to_string(),
                }),
            },
            Command::Shutdown => return Flow::Exit,
        }
        Flow::Continue
    }

    fn tick(&mut self) {
        match self.controller.on_tick() {
            Ok(TickOutcome::Idle) => {}
            Ok(TickOutcome::Sampled(report)) => {
                if let Some(alert) = report.alert {
                    self.emit(RunEvent::Alert(alert));
                }
                self.emit(RunEvent::Tick(Box::new(report)));
            }
            Ok(TickOutcome::Failed(failure)) => self.emit(RunEvent::TickFailed {
                tick: failure.tick,
                elapsed_seconds: failure.elapsed_seconds,
                message: failure.error.to_string(),
            }),
            Err(violation) => {
                error!(%violation, "acquisition invariant broken; aborting run");
                self.controller.stop();
                self.emit(RunEvent::Aborted {
                    reason: violation.to_string(),
                });
                self.emit(RunEvent::StateChanged(RunState::Idle));
                if cfg!(debug_assertions) {
                    panic!("{violation}");
                }
                info!("run aborted; series frozen");
            }
        }
    }
}
