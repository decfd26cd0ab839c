use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("No {family} found on the bus")]
	DeviceNotFound { family: &'static str },

	#[error("Invalid channel {channel}, {family} has channels 1 to {max}")]
	InvalidChannel { family: &'static str, channel: u8, max: u8 },

	#[error("Invalid value {value:?} for {name}")]
	InvalidParameter { name: &'static str, value: String },

	#[error("Invalid coupling type {0:?}, expected DC or AC")]
	InvalidCoupling(String),

	#[error("Instrument reported error {code:?}: {message}")]
	Instrument { code: Option<i32>, message: String },

	#[error("Unable to parse instrument response {0:?}")]
	Parse(String),

	#[error("Transport failure: {0}")]
	Transport(#[from] io::Error),

	#[error("Configuration error: {0}")]
	Config(String),
}
