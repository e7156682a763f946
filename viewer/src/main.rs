mod cli;

use std::error::Error;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::Parser;
use lifefeed::prelude::*;
use lifefeed::runtime::events::{FeedCommandSender, FeedEventReceiver};
use url::Url;

use cli::{Cli, parse_command};

fn main() {
    let cli = Cli::parse();
    init_logger();

    let config = cli.load_config().unwrap_or_else(|err| {
        eprintln!("lifefeed config failed: {}", err);
        std::process::exit(1);
    });

    if let Err(err) = run(&cli, config) {
        eprintln!("lifefeed viewer failed: {}", err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, config: FeedConfig) -> Result<(), Box<dyn Error>> {
    let source = HttpFrameSource::from_config(&config)?;
    let base_url = Url::parse(&config.url)?;
    let storage_dir = storage::config_dir();

    let mut auto_update = config.auto_update;
    let mut resume_after = config.resume_after;

    if cli.resume {
        match storage_dir.as_deref() {
            Some(dir) => match storage::load_session_state_if_exists(dir) {
                Ok(Some(state)) => {
                    info!(
                        "resuming session saved at {:?}",
                        state.saved_at.map(|at| at.to_rfc3339())
                    );
                    auto_update |= state.auto_update;
                    resume_after = resume_after.or(state.last_shown);
                }
                Ok(None) => info!("no saved session to resume"),
                Err(err) => warn!("ignoring saved session: {}", err),
            },
            None => warn!("no config directory, cannot resume"),
        }
    }

    let renderer = if cli.no_clear {
        TerminalRenderer::stdout().without_clearing()
    } else {
        TerminalRenderer::stdout()
    };

    let controller =
        PipelineController::new(Arc::new(source), renderer, config.timing());

    if let Some(sequence) = resume_after {
        controller.resume_after(sequence);
    }

    let session_writer = spawn_session_writer(
        controller.subscribe(),
        storage_dir,
        base_url,
        config.cursor_param.clone(),
    );

    let (commands_tx, commands) = command_channel();
    spawn_input_reader(commands_tx);

    if auto_update {
        controller.start();
    } else {
        info!("press Enter to start or stop the feed, q to quit");
    }

    for command in commands {
        debug!("command {:?}", command);
        match command {
            FeedCommand::Toggle => {
                controller.toggle();
            }
            FeedCommand::Start => {
                controller.start();
            }
            FeedCommand::Stop => {
                controller.stop();
            }
            FeedCommand::Quit => break,
            FeedCommand::InputClosed => {
                while !controller.wait_until_stopped(Duration::from_secs(1)) {}
                break;
            }
        }
    }

    controller.stop();
    controller.join();

    // Drops the event senders so the writer sees the end of the stream.
    drop(controller);
    if session_writer.join().is_err() {
        warn!("session writer panicked");
    }

    Ok(())
}

/// Persists the session on every mode change and logs the address a
/// browser would show for it.
fn spawn_session_writer(
    events: FeedEventReceiver,
    storage_dir: Option<PathBuf>,
    base_url: Url,
    cursor_param: String,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in events {
            let FeedEvent::ModeChanged {
                running,
                last_shown,
            } = event
            else {
                continue;
            };

            let state = SessionState::new(running, last_shown);
            info!(
                "feed {} at {}",
                if running { "running" } else { "stopped" },
                storage::resumable_url(&base_url, &cursor_param, &state)
            );

            let Some(dir) = storage_dir.as_deref() else {
                continue;
            };

            match storage::save_session_state(dir, state) {
                Ok(path) => debug!("session saved to {}", path.display()),
                Err(err) => warn!("failed to save session: {}", err),
            }
        }
    })
}

fn spawn_input_reader(commands: FeedCommandSender) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("failed to read input: {}", err);
                    break;
                }
            };

            let Some(command) = parse_command(&line) else {
                debug!("ignoring input {:?}", line);
                continue;
            };

            if commands.send(command).is_err() {
                return;
            }
        }

        let _ = commands.send(FeedCommand::InputClosed);
    });
}
