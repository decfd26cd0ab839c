
use log::warn;
use serde::Serialize;

use crate::engine::{Delays, Engine, ErrorReport};
use crate::error::{Error, Result};
use crate::transport::Bus;
use super::{connect, Family, Identity, Instrument, DP832};

pub struct Dp832 {
	engine: Engine,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
	pub voltage: f64,
	pub current: f64,
	pub power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelState {
	pub channel: u8,
	pub reading: Reading,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
	pub identity: Identity,
	pub channels: Vec<ChannelState>,
}

fn dc_suffix(dc:bool) -> &'static str { if dc { ":DC" } else { "" } }

pub fn output_cmd(channel:u8, on:bool) -> Result<String> {
	let ch = DP832.check_channel(channel)?;
	Ok(format!(":OUTP CH{},{}", ch, if on { "ON" } else { "OFF" }))
}

// quantity is VOLT, CURR or ALL
pub fn measure_cmd(quantity:&str, channel:u8, dc:bool) -> Result<String> {
	let ch = DP832.check_channel(channel)?;
	Ok(format!(":MEAS:{}{}? CH{}", quantity, dc_suffix(dc), ch))
}

impl Dp832 {

	pub fn open<B: Bus + ?Sized>(bus:&mut B, delays:Delays) -> Result<Self> {
		Ok(Self{ engine: connect(bus, &DP832, delays)? })
	}

	pub fn close(self) -> Result<()> { self.engine.close() }

	pub fn turn_on(&mut self, channel:u8) -> Result<ErrorReport> {
		let cmd:String = output_cmd(channel, true)?;
		self.engine.send(&cmd)
	}

	pub fn turn_off(&mut self, channel:u8) -> Result<ErrorReport> {
		let cmd:String = output_cmd(channel, false)?;
		self.engine.send(&cmd)
	}

	pub fn measure_voltage(&mut self, channel:u8, dc:bool) -> Result<f64> {
		let cmd:String = measure_cmd("VOLT", channel, dc)?;
		self.engine.query_f64(&cmd)
	}

	pub fn measure_current(&mut self, channel:u8, dc:bool) -> Result<f64> {
		let cmd:String = measure_cmd("CURR", channel, dc)?;
		self.engine.query_f64(&cmd)
	}

	// Only the leading value of the reply, see measure_reading for all three
	pub fn measure_all(&mut self, channel:u8, dc:bool) -> Result<f64> {
		let cmd:String = measure_cmd("ALL", channel, dc)?;
		self.engine.query_f64(&cmd)
	}

	pub fn measure_reading(&mut self, channel:u8) -> Result<Reading> {
		let cmd:String = measure_cmd("ALL", channel, false)?;
		match self.engine.query_values(&cmd)?.as_slice() {
			&[voltage, current, power] => Ok(Reading{ voltage, current, power }),
			other => Err(Error::Parse(format!("expected voltage,current,power but got {} values", other.len()))),
		}
	}

	pub fn get_full_state(&mut self) -> Result<State> {
		let identity:Identity = self.identify()?;
		if identity.model != DP832.tag { warn!("Treating a {} as a {}", identity.model, DP832.tag); }

		let mut channels:Vec<ChannelState> = vec![];
		for channel in DP832.channels.clone() {
			channels.push(ChannelState{ channel, reading: self.measure_reading(channel)? });
		}

		Ok(State{ identity, channels })
	}

}

impl Instrument for Dp832 {
	fn family(&self) -> &'static Family { &DP832 }
	fn engine(&mut self) -> &mut Engine { &mut self.engine }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::DeviceId;
	use crate::transport::mock::{MockBus, MockSession};

	fn supply() -> (Dp832, MockSession) {
		let session = MockSession::new();
		let mut bus = MockBus::new("USB");
		bus.attach(DeviceId::new("USB0::0x1AB1::0x0E11::DP8C1234::INSTR"), session.clone());
		(Dp832::open(&mut bus, Delays::none()).unwrap(), session)
	}

	#[test]
	fn on_and_off_differ_only_in_state_token() {
		let on = output_cmd(2, true).unwrap();
		let off = output_cmd(2, false).unwrap();
		assert_eq!(on, ":OUTP CH2,ON");
		assert_eq!(off, ":OUTP CH2,OFF");
		assert_eq!(on.replace("ON", "OFF"), off);
	}

	#[test]
	fn out_of_range_channels_never_reach_the_bus() {
		let (mut dev, session) = supply();
		assert!(matches!(dev.turn_on(0), Err(Error::InvalidChannel{ .. })));
		assert!(matches!(dev.turn_off(4), Err(Error::InvalidChannel{ .. })));
		assert!(matches!(dev.measure_voltage(4, true), Err(Error::InvalidChannel{ .. })));
		assert!(session.transcript().is_empty());
	}

	#[test]
	fn turn_on_is_verified() {
		let (mut dev, session) = supply();
		assert!(dev.turn_on(3).unwrap().is_ok());
		assert_eq!(session.transcript(), vec![":OUTP CH3,ON", "SYST:ERR?"]);
	}

	#[test]
	fn measurements_select_ac_or_dc() {
		let (mut dev, session) = supply();
		session.respond(":MEAS:VOLT? CH1", "12.0000\n");
		session.respond(":MEAS:CURR:DC? CH2", "0.2500\n");
		session.respond(":MEAS:ALL:DC? CH3", "3.3000,0.1000,0.3300\n");

		assert_eq!(dev.measure_voltage(1, false).unwrap(), 12.0);
		assert_eq!(dev.measure_current(2, true).unwrap(), 0.25);
		assert_eq!(dev.measure_all(3, true).unwrap(), 3.3);
	}

	#[test]
	fn full_state_reads_every_channel() {
		let (mut dev, session) = supply();
		session.respond("*IDN?", "RIGOL TECHNOLOGIES,DP832,DP8C1234,00.01.14\n");
		for ch in 1..=3 {
			session.respond(&format!(":MEAS:ALL? CH{}", ch), "5.0000,0.1000,0.5000");
		}

		let state = dev.get_full_state().unwrap();
		assert_eq!(state.identity.model, "DP832");
		assert_eq!(state.channels.len(), 3);
		assert_eq!(state.channels[2].reading, Reading{ voltage: 5.0, current: 0.1, power: 0.5 });
	}

	#[test]
	fn short_reading_is_a_parse_error() {
		let (mut dev, session) = supply();
		session.respond(":MEAS:ALL? CH1", "5.0000");
		assert!(matches!(dev.measure_reading(1), Err(Error::Parse(_))));
	}
}
