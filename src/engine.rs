// The write-then-verify exchange every instrument command goes through.
// A command is written, the instrument gets a moment to digest it, and then its error queue is
// read with `SYST:ERR?`. Whatever the queue says comes back as an ErrorReport; a SCPI error
// is data for the caller to act on, only transport failures are `Err`.

use std::str;
use std::thread;
use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::config::{DEFAULT_RESET_DELAY_SEC, DEFAULT_SETTLE_DELAY_SEC};
use crate::error::{Error, Result};
use crate::transport::Session;

pub const ERROR_QUERY:&str = "SYST:ERR?";
pub const RESET:&str = "*RST";

lazy_static! {
	static ref SYST_ERR_RE: Regex = Regex::new(r#"^\s*([+-]?\d+)\s*,\s*"?([^"]*)"?\s*$"#).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
	// Between a command and the error query
	pub settle: Duration,
	// After a reset
	pub reset: Duration,
}

impl Delays {
	pub fn none() -> Self { Self{ settle: Duration::from_secs(0), reset: Duration::from_secs(0) } }
}

impl Default for Delays {
	fn default() -> Self {
		Self {
			settle: Duration::from_secs_f32(DEFAULT_SETTLE_DELAY_SEC),
			reset: Duration::from_secs_f32(DEFAULT_RESET_DELAY_SEC),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReport {
	Ok,
	// `code` is `None` when the reply didn't follow the `<code>,"<message>"` form
	Error { code: Option<i32>, message: String },
}

impl ErrorReport {

	pub fn parse(reply:&str) -> Self {
		match SYST_ERR_RE.captures(reply) {
			Some(cap) => match cap[1].parse::<i32>() {
				Ok(0)    => ErrorReport::Ok,
				Ok(code) => ErrorReport::Error{ code: Some(code), message: cap[2].trim().to_owned() },
				Err(_)   => ErrorReport::Error{ code: None, message: reply.trim().to_owned() },
			},
			None if reply.trim().is_empty() => ErrorReport::Error{ code: None, message: "Empty reply to error query".to_owned() },
			None => ErrorReport::Error{ code: None, message: reply.trim().to_owned() },
		}
	}

	pub fn is_ok(&self) -> bool { *self == ErrorReport::Ok }

	pub fn into_result(self) -> Result<()> {
		match self {
			ErrorReport::Ok => Ok(()),
			ErrorReport::Error{ code, message } => Err(Error::Instrument{ code, message }),
		}
	}

}

pub fn parse_values(reply:&str) -> Result<Vec<f64>> {
	reply.trim()
		.split(',')
		.map(|tok| tok.trim().parse::<f64>().map_err(|_| Error::Parse(reply.trim().to_owned())))
		.collect()
}

// Owns the session of one opened device.
pub struct Engine {
	session: Box<dyn Session>,
	name: String,
	delays: Delays,
	closed: bool,
}

impl Engine {

	pub fn new(session:Box<dyn Session>, name:&str, delays:Delays) -> Self {
		Self{ session, name: name.to_owned(), delays, closed: false }
	}

	pub fn send(&mut self, cmd:&str) -> Result<ErrorReport> {
		self.session.write(cmd.as_bytes())?;
		thread::sleep(self.delays.settle);

		let reply:String = self.query(ERROR_QUERY)?;
		let report = ErrorReport::parse(&reply);
		match &report {
			ErrorReport::Ok => debug!("`{}` received by {}. No error occurred", cmd, self.name),
			ErrorReport::Error{ message, .. } => warn!("`{}` received by {}. An error occurred: {}", cmd, self.name, message),
		}
		Ok(report)
	}

	// Plain write and read back, no error query since queries don't change instrument state
	pub fn query(&mut self, cmd:&str) -> Result<String> {
		let raw:Vec<u8> = self.session.query(cmd.as_bytes())?;
		String::from_utf8(raw).map_err(|e| Error::Parse(String::from_utf8_lossy(e.as_bytes()).into_owned()))
	}

	pub fn query_values(&mut self, cmd:&str) -> Result<Vec<f64>> {
		let reply:String = self.query(cmd)?;
		parse_values(&reply)
	}

	// Scalar queries answer with a single float, anything after the first is ignored
	pub fn query_f64(&mut self, cmd:&str) -> Result<f64> {
		let reply:String = self.query(cmd)?;
		let first:&str = reply.split(',').next().unwrap_or("").trim();
		first.parse::<f64>().map_err(|_| Error::Parse(reply.trim().to_owned()))
	}

	pub fn reset(&mut self) -> Result<ErrorReport> {
		let report = self.send(RESET)?;
		thread::sleep(self.delays.reset);
		Ok(report)
	}

	pub fn close(mut self) -> Result<()> {
		self.closed = true;
		info!("Closing {}", self.name);
		self.session.close().map_err(Error::from)
	}

}

impl Drop for Engine {

	fn drop(&mut self) {
		if self.closed { return; }
		if let Err(e) = self.session.close() {
			warn!("Unable to close {}: {}", self.name, e);
		}
	}

}
