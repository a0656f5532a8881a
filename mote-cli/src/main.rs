//! Motelist
//!
//! Detects and prints the motes connected to this computer, once or
//! continuously as they are plugged in and removed.

mod settings;

use std::sync::{Arc, Weak};

use anyhow::{Context, Result};
use clap::Parser;
use mote_list::{backend, display, Mote, MoteError, Poller, RawMote, Registry};
use settings::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "motelist")]
#[command(about = "Automatically detect and print out a list of motes connected to this computer")]
#[command(version)]
struct Args {
    /// Print list in CSV format
    #[arg(short, long)]
    csv: bool,

    /// Omit header row
    #[arg(short, long)]
    omit_header: bool,

    /// Only print serial port paths
    #[arg(short, long)]
    brief: bool,

    /// Keep running and print the list whenever it changes
    #[arg(short, long)]
    watch: bool,

    /// Delay between scans in watch mode (overrides the settings file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Register a mote by hand: PORT,NAME,REFERENCE (repeatable)
    #[arg(long = "add", value_name = "PORT,NAME,REFERENCE")]
    add: Vec<String>,
}

/// Output layout selected on the command line
#[derive(Debug, Clone, Copy)]
struct Output {
    csv: bool,
    brief: bool,
    omit_header: bool,
}

impl Output {
    /// Placeholder for an empty list in formats that would otherwise print
    /// nothing. The table has its own message.
    fn placeholder(&self, motes: &[Mote]) -> Option<display::NoMotes> {
        (motes.is_empty() && (self.brief || self.csv)).then_some(display::NoMotes)
    }

    fn render(&self, motes: &[Mote]) -> String {
        if self.brief {
            display::format_brief(motes)
        } else if self.csv {
            display::format_csv(motes, self.omit_header)
        } else {
            display::format_table(motes, self.omit_header)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motelist=info,mote_list=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings = Settings::load();
    if let Some(interval_ms) = args.interval_ms {
        settings.poll_interval_ms = interval_ms;
    }

    let backend = backend::detect_with_config(settings.scanner_config())?;
    let registry: Arc<Registry> = Arc::new(
        Registry::from_boxed(backend, settings.registry_config()),
    );
    tracing::debug!("Using {} backend", registry.backend_name());

    for mote in &settings.manual_motes {
        registry.add_manual_mote(&mote.port, &mote.name, &mote.reference);
    }
    for value in &args.add {
        let raw = parse_manual(value).with_context(|| format!("invalid --add value '{}'", value))?;
        if !registry.add_manual_mote(raw.port, raw.name, raw.reference) {
            tracing::warn!("Mote on {} not added", value);
        }
    }

    let output = Output {
        csv: args.csv,
        brief: args.brief,
        omit_header: args.omit_header,
    };

    if !args.watch {
        let motes = registry.get_list(true)?;
        if let Some(placeholder) = output.placeholder(&motes) {
            eprintln!("{}", placeholder);
        }
        print!("{}", output.render(&motes));
        return Ok(());
    }

    watch(registry, settings, output).await
}

/// Print the list every time it changes until interrupted
async fn watch(registry: Arc<Registry>, settings: Settings, output: Output) -> Result<()> {
    let weak: Weak<Registry> = Arc::downgrade(&registry);
    registry.subscribe(move || {
        if let Some(registry) = weak.upgrade() {
            let motes = registry.get_list(false)?;
            if let Some(placeholder) = output.placeholder(&motes) {
                eprintln!("{}", placeholder);
            }
            println!("{}", output.render(&motes));
        }
        Ok(())
    });

    // Print the starting list even if it is empty
    registry.run_once(true)?;

    let poller = Poller::with_config(registry.clone(), settings.poller_config());
    poller.start()?;
    tracing::info!("Watching for motes, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    poller.shutdown().await;
    Ok(())
}

/// Parse `PORT,NAME,REFERENCE`; the reference may be left out
fn parse_manual(value: &str) -> Result<RawMote, MoteError> {
    let mut fields: Vec<&str> = value.split(',').map(str::trim).collect();
    if fields.len() == 2 {
        fields.push("");
    }
    RawMote::from_fields(&fields)
}
