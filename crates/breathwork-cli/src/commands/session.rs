use breathwork_core::session::format_elapsed;
use breathwork_core::storage::Database;
use breathwork_core::{
    run_session, Config, EnglishText, Event, SessionCommand, SessionController, SessionSnapshot,
};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run the configured plan. Enter presses the action button, "q" quits.
    Run {
        /// Press the button once right away
        #[arg(long)]
        start: bool,
        /// Print snapshots and events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run { start, json } => {
            let config = Config::load()?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(drive(config, start, json))
        }
    }
}

async fn drive(config: Config, start: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut controller = SessionController::new(config.plan(), Handle::current())
        .with_period_ms(config.timer.period_ms);
    if config.history.enabled {
        controller = controller.with_sink(Database::open()?);
    }
    debug!(
        period_ms = config.timer.period_ms,
        history = config.history.enabled,
        "session runner starting"
    );

    let mut snapshots = controller.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(run_session(controller, cmd_rx, event_tx));

    let initial = snapshots.borrow_and_update().clone();
    print_snapshot(&initial, json)?;
    if start {
        cmd_tx.send(SessionCommand::Click).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let command = match line? {
                    Some(line) if line.trim().eq_ignore_ascii_case("q") => SessionCommand::Stop,
                    Some(_) => SessionCommand::Click,
                    None => SessionCommand::Stop,
                };
                cmd_tx.send(command).await?;
                if command == SessionCommand::Stop {
                    break;
                }
            }
            Ok(()) = snapshots.changed() => {
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(&snapshot, json)?;
            }
            Some(event) = event_rx.recv() => print_event(&event, json)?,
        }
    }

    drop(cmd_tx);
    runner.await?;
    while let Ok(event) = event_rx.try_recv() {
        print_event(&event, json)?;
    }
    Ok(())
}

fn print_snapshot(snapshot: &SessionSnapshot, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }
    let view = &snapshot.view;
    println!(
        "{:<16} {} (total {}) {:>3}%  [{}]",
        view.round_type,
        view.current_time_text,
        view.total_time_text,
        (view.progress * 100.0).round() as u32,
        snapshot.button.label.resolve(&EnglishText),
    );
    Ok(())
}

fn print_event(event: &Event, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::SessionStarted {
            title, round_count, ..
        } => println!("== {} ({round_count} rounds)", title.resolve(&EnglishText)),
        Event::RoundAdvanced {
            lap, round_type, ..
        } => println!("-- lap {}: {}  next: {round_type}", lap.index, lap.display_time),
        Event::NextRequired { .. } => println!("-- round complete, press Enter for the next one"),
        Event::SessionFinished {
            lap, lap_count, total_ms, ..
        } => println!(
            "== lap {}: {}  finished {lap_count} rounds in {}",
            lap.index,
            lap.display_time,
            format_elapsed(*total_ms),
        ),
        Event::SessionPaused { .. } | Event::SessionResumed { .. } => {}
        Event::SessionStopped { .. } => println!("== stopped"),
    }
    Ok(())
}
