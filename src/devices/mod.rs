
// Currently all devices supported here are Rigol. Each family is a registry entry (how to recognize
// it on the bus and which channels it has) plus a module with its command set.

use std::ops::RangeInclusive;

use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use serde::Serialize;

use crate::engine::{Delays, Engine, ErrorReport};
use crate::error::{Error, Result};
use crate::transport::{self, Bus, DeviceId};

pub mod dp832;
pub mod ds1054z;

lazy_static! {
	static ref IDN_RE: Regex = Regex::new("([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

#[derive(Debug, PartialEq, Eq)]
pub struct Family {
	pub tag: &'static str,
	// Substring of the bus identifier that marks this family
	pub token: &'static str,
	pub channels: RangeInclusive<u8>,
}

impl Family {

	pub fn matches(&self, id:&DeviceId) -> bool { id.contains(self.token) }

	pub fn check_channel(&self, channel:u8) -> Result<u8> {
		if self.channels.contains(&channel) { Ok(channel) }
		else { Err(Error::InvalidChannel{ family: self.tag, channel, max: *self.channels.end() }) }
	}

}

pub const DP832:Family   = Family{ tag: "DP832", token: "DP8", channels: 1..=3 };
pub const DS1054Z:Family = Family{ tag: "DS1054Z", token: "DS1Z", channels: 1..=4 };

pub const FAMILIES:&[Family] = &[DP832, DS1054Z];

pub fn lookup(tag:&str) -> Option<&'static Family> {
	FAMILIES.iter().find(|f| f.tag.eq_ignore_ascii_case(tag))
}

// Which registered family, if any, a discovered device belongs to
pub fn identify_family(id:&DeviceId) -> Option<&'static Family> {
	FAMILIES.iter().find(|f| f.matches(id))
}

// Opens the first discovered device of `family`. Nothing is left open if that fails.
pub fn connect<B: Bus + ?Sized>(bus:&mut B, family:&'static Family, delays:Delays) -> Result<Engine> {
	let id:DeviceId = transport::discover(bus)?
		.into_iter()
		.find(|id| family.matches(id))
		.ok_or(Error::DeviceNotFound{ family: family.tag })?;

	let session = bus.open(&id)?;
	info!("Connected device! {} as {}", id, family.tag);

	Ok(Engine::new(session, &id.address, delays))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

impl Identity {

	pub fn parse(idn:&str) -> Result<Self> {
		let cap = IDN_RE.captures(idn.trim()).ok_or_else(|| Error::Parse(idn.trim().to_owned()))?;
		Ok(Self {
			manufacturer: cap[1].trim().to_owned(),
			model: cap[2].trim().to_owned(),
			serial_num: cap[3].trim().to_owned(),
			fw_version: cap[4].trim().to_owned(),
		})
	}

}

// What every instrument family can do, whatever its command set.
pub trait Instrument {

	fn family(&self) -> &'static Family;

	fn engine(&mut self) -> &mut Engine;

	fn send(&mut self, cmd:&str) -> Result<ErrorReport> { self.engine().send(cmd) }

	fn query(&mut self, cmd:&str) -> Result<String> { self.engine().query(cmd) }

	fn reset(&mut self) -> Result<ErrorReport> { self.engine().reset() }

	fn identify(&mut self) -> Result<Identity> {
		let idn:String = self.query("*IDN?")?;
		Identity::parse(&idn)
	}

}
