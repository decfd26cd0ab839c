// Runtime settings, read from TOML.
// ```toml
// settle_delay_sec = 0.1
// reset_delay_sec = 0.2
// io_timeout_ms = 10000
// hosts = ["192.168.2.4", "192.168.2.2"]
// ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::Delays;
use crate::error::{Error, Result};

pub const DEFAULT_SETTLE_DELAY_SEC:f32 = 0.1;
pub const DEFAULT_RESET_DELAY_SEC:f32  = 0.2;
pub const DEFAULT_IO_TIMEOUT_MS:u64    = 10000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	// Wait between a command and the error query that checks it
	pub settle_delay_sec: f32,
	// Wait after `*RST` before the next command
	pub reset_delay_sec: f32,
	pub io_timeout_ms: u64,
	// LAN instruments to probe during discovery
	pub hosts: Vec<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			settle_delay_sec: DEFAULT_SETTLE_DELAY_SEC,
			reset_delay_sec: DEFAULT_RESET_DELAY_SEC,
			io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
			hosts: vec![],
		}
	}
}

fn secs(name:&str, x:f32) -> Result<Duration> {
	Duration::try_from_secs_f32(x).map_err(|e| Error::Config(format!("{} = {}: {}", name, x, e)))
}

impl Settings {

	pub fn from_toml_str(s:&str) -> Result<Self> {
		toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
	}

	pub fn load<P: AsRef<Path>>(path:P) -> Result<Self> {
		let path = path.as_ref();
		let text = fs::read_to_string(path).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
		Self::from_toml_str(&text)
	}

	pub fn delays(&self) -> Result<Delays> {
		Ok(Delays {
			settle: secs("settle_delay_sec", self.settle_delay_sec)?,
			reset: secs("reset_delay_sec", self.reset_delay_sec)?,
		})
	}

	pub fn io_timeout(&self) -> Duration { Duration::from_millis(self.io_timeout_ms) }

}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn missing_keys_fall_back_to_defaults() {
		let settings = Settings::from_toml_str("hosts = [\"192.168.2.4\"]").unwrap();
		assert_eq!(settings.hosts, vec!["192.168.2.4".to_owned()]);
		assert_eq!(settings.delays().unwrap(), Delays::default());
		assert_eq!(settings.io_timeout(), Duration::from_secs(10));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(matches!(Settings::from_toml_str("settle_delay = 1.0"), Err(Error::Config(_))));
	}

	#[test]
	fn negative_delays_are_rejected() {
		let settings = Settings::from_toml_str("reset_delay_sec = -1.0").unwrap();
		assert!(matches!(settings.delays(), Err(Error::Config(_))));
	}

	#[test]
	fn huge_delays_are_rejected() {
		let settings = Settings::from_toml_str("settle_delay_sec = 1e20").unwrap();
		assert!(matches!(settings.delays(), Err(Error::Config(_))));
	}

	#[test]
	fn loads_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "settle_delay_sec = 0.0\nreset_delay_sec = 0.5").unwrap();

		let delays = Settings::load(file.path()).unwrap().delays().unwrap();
		assert_eq!(delays.settle, Duration::from_secs(0));
		assert_eq!(delays.reset, Duration::from_millis(500));
	}
}
