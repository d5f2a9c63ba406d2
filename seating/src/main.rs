//! `seat-plan` command-line front end.
//!
//! # Usage
//!
//! ```bash
//! seat-plan show
//! seat-plan import roster.txt
//! seat-plan reserve 5 Kim 010-1234-5678 Yangjae paid
//! seat-plan cancel 5 Kim 010-1234-5678
//! seat-plan clear
//! ```
//!
//! Every command except `import` starts from the reservations stored in
//! `SEATING_DATA_FILE`. `import` previews a pasted roster without saving it.

use anyhow::{bail, Context};
use bus_seating::{
    config::Config,
    engine::SeatingEngine,
    render::ConsoleRenderer,
    types::{CancellationRequest, PaymentStatus, ReservationRequest},
};
use seatplan_runtime::metrics::register_metrics;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: seat-plan <show | import <file> | reserve <seat> <name> <phone> <location> [paid|pending] | cancel <seat> <name> <phone> | clear>";

/// One invocation of the tool
#[derive(Debug)]
enum Command {
    Show,
    Import(PathBuf),
    Reserve(ReservationRequest),
    Cancel(CancellationRequest),
    Clear,
}

impl Command {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            [] | ["show"] => Ok(Self::Show),
            ["import", file] => Ok(Self::Import(PathBuf::from(*file))),
            ["reserve", seat, name, phone, location, rest @ ..] => {
                let status = match rest {
                    [] | ["pending"] => PaymentStatus::Pending,
                    ["paid"] => PaymentStatus::Paid,
                    _ => bail!(USAGE),
                };
                Ok(Self::Reserve(
                    ReservationRequest::new(parse_seat(seat)?, *name, *phone, *location)
                        .with_payment_status(status),
                ))
            },
            ["cancel", seat, name, phone] => Ok(Self::Cancel(CancellationRequest::new(
                parse_seat(seat)?,
                *name,
                *phone,
            ))),
            ["clear"] => Ok(Self::Clear),
            _ => bail!(USAGE),
        }
    }
}

fn parse_seat(raw: &str) -> anyhow::Result<u32> {
    raw.parse()
        .with_context(|| format!("seat must be a number, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    register_metrics();

    info!(
        log_level = %config.log_level,
        data_file = %config.storage.data_file.display(),
        request_timeout_secs = config.engine.request_timeout_secs,
        "Configuration loaded"
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let engine = SeatingEngine::from_config(&config, Arc::new(ConsoleRenderer));

    match command {
        Command::Show => {
            let loaded = engine.load_reservations().await?;
            info!(loaded, "Reservations loaded");
        },
        Command::Import(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read roster {}", path.display()))?;
            let summary = engine.import_roster(&text).await?;
            info!(
                imported = summary.imported,
                skipped_lines = summary.skipped_lines,
                "Roster imported"
            );
        },
        Command::Reserve(request) => {
            engine.load_reservations().await?;
            let reservation = engine.reserve_seat(request).await?;
            info!(
                seat = %reservation.seat(),
                name = reservation.name(),
                "Seat reserved"
            );
        },
        Command::Cancel(request) => {
            engine.load_reservations().await?;
            let reservation = engine.cancel_reservation(request).await?;
            info!(
                seat = %reservation.seat(),
                name = reservation.name(),
                "Reservation cancelled"
            );
        },
        Command::Clear => {
            engine.load_reservations().await?;
            engine.clear_all().await?;
            info!("All reservations cleared");
        },
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Command> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        Command::parse(&args)
    }

    fn reserve_status(status: &[&str]) -> PaymentStatus {
        let mut args = vec!["reserve", "5", "Kim", "010-1234-5678", "Yangjae"];
        args.extend_from_slice(status);
        match parse(&args).unwrap() {
            Command::Reserve(request) => request.payment_status,
            other => unreachable!("expected a reservation, got {other:?}"),
        }
    }

    #[test]
    fn reserve_reads_the_payment_status() {
        assert_eq!(reserve_status(&["paid"]), PaymentStatus::Paid);
        assert_eq!(reserve_status(&["pending"]), PaymentStatus::Pending);
        assert_eq!(reserve_status(&[]), PaymentStatus::Pending);
    }

    #[test]
    fn reserve_rejects_unknown_status_words() {
        let base = ["reserve", "5", "Kim", "010-1234-5678", "Yangjae"];
        for status in [&["done"][..], &["입완"], &["Paid"], &["paid", "extra"]] {
            let args: Vec<&str> = base.iter().chain(status).copied().collect();
            assert!(parse(&args).is_err(), "{status:?} should be refused");
        }
    }

    #[test]
    fn reserve_keeps_the_form_fields() {
        let Command::Reserve(request) =
            parse(&["reserve", "12", "Kim", "010-1234-5678", "Yangjae", "paid"]).unwrap()
        else {
            unreachable!("expected a reservation");
        };
        assert_eq!(
            request,
            ReservationRequest::new(12, "Kim", "010-1234-5678", "Yangjae")
                .with_payment_status(PaymentStatus::Paid)
        );
    }

    #[test]
    fn other_commands_parse() {
        assert!(matches!(parse(&[]).unwrap(), Command::Show));
        assert!(matches!(parse(&["show"]).unwrap(), Command::Show));
        assert!(matches!(parse(&["clear"]).unwrap(), Command::Clear));
        assert!(matches!(
            parse(&["import", "roster.txt"]).unwrap(),
            Command::Import(path) if path == PathBuf::from("roster.txt")
        ));
        assert!(matches!(
            parse(&["cancel", "3", "Kim", "010-1234-5678"]).unwrap(),
            Command::Cancel(request) if request.seat == 3
        ));
        assert!(parse(&["cancel", "three", "Kim", "010-1234-5678"]).is_err());
        assert!(parse(&["fly"]).is_err());
    }
}
