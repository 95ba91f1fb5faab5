//! Async driver for a [`SessionController`].
//!
//! The runner is the single place the controller is mutated: button presses
//! and timer callbacks are taken one at a time from a `select!` loop.

use tokio::sync::mpsc;
use tracing::debug;

use super::controller::SessionController;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Press the action button.
    Click,
    /// Tear the session down and end the runner.
    Stop,
}

/// Drive `controller` until [`SessionCommand::Stop`] arrives or the command
/// channel closes. Events are forwarded to `events` while anyone listens.
/// Returns the torn-down controller.
pub async fn run_session(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<Event>,
) -> SessionController {
    let emit = |event: Option<Event>| {
        if let Some(event) = event {
            let _ = events.send(event);
        }
    };

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Click) => emit(controller.click()),
                Some(SessionCommand::Stop) | None => {
                    debug!("session runner stopping");
                    emit(controller.teardown());
                    break;
                }
            },
            Some(timer_event) = controller.next_timer_event() => {
                emit(controller.handle_timer_event(timer_event));
            }
        }
    }

    controller
}
