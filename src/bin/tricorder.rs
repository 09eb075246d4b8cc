#![allow(unknown_lints)]

extern crate chan_signal;
extern crate chrono;
extern crate fern;
extern crate tricorder;

#[macro_use]
extern crate log;

use chrono::Utc;
use std::process;
use std::sync::Arc;
use tricorder::health::{HealthHandler, HealthState};
use tricorder::http;

fn main() {
    // Signals must be registered before any thread is spawned.
    let signal = chan_signal::notify(&[chan_signal::Signal::INT, chan_signal::Signal::TERM]);

    let args = match tricorder::config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("tricorder: {}", e);
            process::exit(1);
        }
    };

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or(""),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .expect("could not set up logging");

    info!("tricorder - {}", args.version);

    let state = Arc::new(HealthState::new());
    let server = match http::Server::new(
        &args.health_addr(),
        HealthHandler::new(Arc::clone(&state)),
    ) {
        Ok(server) => server,
        Err(e) => {
            error!("could not bind {}: {}", args.health_addr(), e);
            process::exit(1);
        }
    };
    if args.ready_on_start {
        state.set_ready();
    }

    match signal.recv() {
        Some(sig) => info!("received {:?}, shutting down", sig),
        None => warn!("signal channel closed, shutting down"),
    }
    state.set_not_ready("shutting down");
    server.shutdown();
}
