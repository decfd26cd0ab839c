use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::error;

use benchtop::config::Settings;
use benchtop::devices;
use benchtop::transport;
use benchtop::vxi11::Vxi11Bus;
use benchtop::{Dp832, Ds1054z, Error, Result};

#[derive(Parser)]
#[command(about = "Talk to bench instruments over VXI-11")]
struct Cli {
	/// TOML settings file
	#[arg(long)]
	config: Option<PathBuf>,

	/// Instrument host to probe, in addition to those in the settings file
	#[arg(long = "host")]
	hosts: Vec<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// List the instruments that answer
	List {
		/// Only show instruments of this family, e.g. DP832
		#[arg(long)]
		family: Option<String>,
	},

	/// Stop the scope and print one channel's samples
	Capture {
		#[arg(long, default_value_t = 1)]
		channel: u8,
	},

	/// Print the power supply's state as JSON
	Supply,
}

fn run(cli:Cli) -> Result<()> {
	let mut settings:Settings = match &cli.config {
		Some(path) => Settings::load(path)?,
		None => Settings::default(),
	};
	settings.hosts.extend(cli.hosts);

	let delays = settings.delays()?;
	let mut bus = Vxi11Bus::new(settings.hosts.clone(), settings.io_timeout());

	match cli.command {
		Command::List{ family } => {
			let only:Option<&devices::Family> = match family {
				Some(tag) => Some(devices::lookup(&tag).ok_or(Error::InvalidParameter{ name: "family", value: tag })?),
				None => None,
			};
			for id in transport::discover(&mut bus)? {
				if only.map_or(false, |f| !f.matches(&id)) { continue; }
				let family:&str = devices::identify_family(&id).map(|f| f.tag).unwrap_or("unknown");
				println!("{}\t{}\t{}", id, family, id.hint);
			}
		},
		Command::Capture{ channel } => {
			let mut scope = Ds1054z::open(&mut bus, delays)?;
			scope.stop_capture()?;
			for v in scope.get_samples(channel)? {
				println!("{}", v);
			}
			scope.close()?;
		},
		Command::Supply => {
			let mut supply = Dp832::open(&mut bus, delays)?;
			let state = supply.get_full_state()?;
			match serde_json::to_string_pretty(&state) {
				Ok(json) => println!("{}", json),
				Err(e) => error!("Unable to serialize state: {}", e),
			}
			supply.close()?;
		},
	}

	Ok(())
}

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = run(Cli::parse()) {
		error!("{}", e);
		process::exit(1);
	}
}
