
use std::str::FromStr;

use log::error;
use serde::Serialize;

use crate::engine::{Delays, Engine, ErrorReport};
use crate::error::{Error, Result};
use crate::transport::Bus;
use super::{connect, Family, Identity, Instrument, DS1054Z};

pub mod waveform;

use waveform::Samples;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling { DC, AC }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope { Falling, Rising }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep { Single }

impl FromStr for Coupling {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self> {
		match s.trim().to_uppercase().as_str() {
			"DC" => Ok(Coupling::DC),
			"AC" => Ok(Coupling::AC),
			_    => Err(Error::InvalidCoupling(s.to_owned())),
		}
	}
}

impl FromStr for Slope {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self> {
		match s.trim().to_lowercase().as_str() {
			"falling" => Ok(Slope::Falling),
			"rising"  => Ok(Slope::Rising),
			_         => Err(Error::InvalidParameter{ name: "slope", value: s.to_owned() }),
		}
	}
}

impl FromStr for Sweep {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self> {
		match s.trim().to_lowercase().as_str() {
			"single" => Ok(Sweep::Single),
			_        => Err(Error::InvalidParameter{ name: "trigger type", value: s.to_owned() }),
		}
	}
}

impl Coupling {
	pub fn as_scpi(self) -> &'static str { match self { Coupling::DC => "DC", Coupling::AC => "AC" } }
}

impl Slope {
	pub fn as_scpi(self) -> &'static str { match self { Slope::Falling => "NEG", Slope::Rising => "POS" } }
}

impl Sweep {
	pub fn as_scpi(self) -> &'static str { match self { Sweep::Single => "SING" } }
}

// Edge trigger settings as the user spells them. Nothing is checked until commands().
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTrigger {
	pub channel: u8,
	pub level: f64,
	pub trigger_type: String,
	pub coupling: String,
	pub slope: String,
}

impl EdgeTrigger {

	pub fn new(channel:u8, level:f64) -> Self {
		Self {
			channel,
			level,
			trigger_type: "single".to_owned(),
			coupling: "DC".to_owned(),
			slope: "falling".to_owned(),
		}
	}

	pub fn trigger_type(mut self, s:&str) -> Self { self.trigger_type = s.to_owned(); self }
	pub fn coupling(mut self, s:&str) -> Self { self.coupling = s.to_owned(); self }
	pub fn slope(mut self, s:&str) -> Self { self.slope = s.to_owned(); self }

	// Source, sweep, coupling, slope, then the level
	pub fn commands(&self) -> Result<Vec<String>> {
		let channel:u8 = DS1054Z.check_channel(self.channel)?;
		let coupling:Coupling = self.coupling.parse()?;
		let slope:Slope = self.slope.parse()?;
		let sweep:Sweep = self.trigger_type.parse()?;
		if !self.level.is_finite() {
			return Err(Error::InvalidParameter{ name: "trigger level", value: self.level.to_string() });
		}

		Ok(vec![
			format!(":TRIG:EDGE:SOUR CHAN{}", channel),
			format!(":TRIG:EDGE:SWE {}", sweep.as_scpi()),
			format!(":TRIG:EDGE:COUP {}", coupling.as_scpi()),
			format!(":TRIG:EDGE:SLOP {}", slope.as_scpi()),
			format!(":TRIG:EDGE:LEV {:.5}", self.level),
		])
	}

}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelState {
	pub channel: u8,
	pub enabled: bool,
	pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
	pub identity: Identity,
	pub timescale: f64,
	pub trigger_offset: f64,
	pub sample_rate: f64,
	pub channels: Vec<ChannelState>,
}

pub struct Ds1054z {
	engine: Engine,
}

impl Ds1054z {

	pub const DIVS_VERTICAL:u32 = 8;
	pub const DIVS_HORIZONTAL:u32 = 12;

	pub fn open<B: Bus + ?Sized>(bus:&mut B, delays:Delays) -> Result<Self> {
		Ok(Self{ engine: connect(bus, &DS1054Z, delays)? })
	}

	pub fn close(self) -> Result<()> { self.engine.close() }

	pub fn turn_on(&mut self, channel:u8) -> Result<ErrorReport> {
		let ch = DS1054Z.check_channel(channel)?;
		self.engine.send(&format!(":CHAN{}:DISP ON", ch))
	}

	pub fn turn_off(&mut self, channel:u8) -> Result<ErrorReport> {
		let ch = DS1054Z.check_channel(channel)?;
		self.engine.send(&format!(":CHAN{}:DISP OFF", ch))
	}

	pub fn is_enabled(&mut self, channel:u8) -> Result<bool> {
		let ch = DS1054Z.check_channel(channel)?;
		Ok(self.engine.query_f64(&format!(":CHAN{}:DISP?", ch))? != 0.0)
	}

	pub fn set_channel_scale(&mut self, channel:u8, scale_volts:f64) -> Result<ErrorReport> {
		let ch = DS1054Z.check_channel(channel)?;
		self.engine.send(&format!(":CHAN{}:SCAL {}", ch, scale_volts))
	}

	pub fn get_channel_scale(&mut self, channel:u8) -> Result<f64> {
		let ch = DS1054Z.check_channel(channel)?;
		self.engine.query_f64(&format!(":CHAN{}:SCAL?", ch))
	}

	pub fn set_channel_offset(&mut self, channel:u8, offset_volts:f64) -> Result<ErrorReport> {
		let ch = DS1054Z.check_channel(channel)?;
		self.engine.send(&format!(":CHAN{}:OFFS {}", ch, offset_volts))
	}

	// TODO: confirm against the programming guide whether :CHAN<n>:OFFS? should be read here instead
	// of the waveform Y origin, which is what the offset has always been read back from
	pub fn get_channel_offset(&mut self, channel:u8) -> Result<f64> {
		DS1054Z.check_channel(channel)?;
		self.engine.query_f64(":WAV:YOR?")
	}

	pub fn set_timescale(&mut self, seconds:f64) -> Result<ErrorReport> { self.engine.send(&format!(":TIM:SCAL {}", seconds)) }
	pub fn get_timescale(&mut self) -> Result<f64> { self.engine.query_f64(":TIM:SCAL?") }

	pub fn set_trigger_offset(&mut self, seconds:f64) -> Result<ErrorReport> { self.engine.send(&format!(":TIM:OFFS {}", seconds)) }
	pub fn get_trigger_offset(&mut self) -> Result<f64> { self.engine.query_f64(":TIM:OFFS?") }

	// One-liners
	pub fn start_capture(&mut self) -> Result<ErrorReport> { self.engine.send(":START") }
	pub fn stop_capture(&mut self)  -> Result<ErrorReport> { self.engine.send(":STOP") }
	pub fn force_trigger(&mut self) -> Result<ErrorReport> { self.engine.send(":KEY:FORCE") }
	pub fn get_sample_rate(&mut self) -> Result<f64>       { self.engine.query_f64(":ACQ:SAMP?") }

	// Every command is validated before the first one is sent, then each is verified in turn.
	pub fn configure_edge_trigger(&mut self, trigger:&EdgeTrigger) -> Result<Vec<ErrorReport>> {
		let mut reports:Vec<ErrorReport> = vec![];
		for cmd in trigger.commands()? {
			reports.push(self.engine.send(&cmd)?);
		}
		Ok(reports)
	}

	pub fn get_samples(&mut self, channel:u8) -> Result<Samples> {
		let ch = DS1054Z.check_channel(channel)?;

		// A rejected mode change doesn't stop the data query, the reports travel with the samples
		let mut reports:Vec<ErrorReport> = vec![];
		for cmd in &[":WAV:FORM ASCII", ":WAV:POIN:MODE RAW"] {
			let report = self.engine.send(cmd)?;
			if let ErrorReport::Error{ message, .. } = &report {
				error!("Waveform of CHAN{} may not be ASCII raw points, `{}` failed: {}", ch, cmd, message);
			}
			reports.push(report);
		}

		let reply:String = self.engine.query(&format!(":WAV:DATA? CHAN{}", ch))?;
		Ok(Samples::from_reply(&reply).with_reports(reports))
	}

	pub fn get_full_state(&mut self) -> Result<State> {
		let identity:Identity = self.identify()?;
		let timescale:f64 = self.get_timescale()?;
		let trigger_offset:f64 = self.get_trigger_offset()?;
		let sample_rate:f64 = self.get_sample_rate()?;

		let mut channels:Vec<ChannelState> = vec![];
		for channel in DS1054Z.channels.clone() {
			let enabled:bool = self.is_enabled(channel)?;
			let scale:f64 = self.get_channel_scale(channel)?;
			channels.push(ChannelState{ channel, enabled, scale });
		}

		Ok(State{ identity, timescale, trigger_offset, sample_rate, channels })
	}

}

impl Instrument for Ds1054z {
	fn family(&self) -> &'static Family { &DS1054Z }
	fn engine(&mut self) -> &mut Engine { &mut self.engine }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::DeviceId;
	use crate::transport::mock::{MockBus, MockSession};

	fn scope() -> (Ds1054z, MockSession) {
		let session = MockSession::new();
		let mut bus = MockBus::new("USB");
		bus.attach(DeviceId::new("USB0::0x1AB1::0x04CE::DS1ZA1234::INSTR"), session.clone());
		(Ds1054z::open(&mut bus, Delays::none()).unwrap(), session)
	}

	#[test]
	fn channel_five_is_rejected_before_sending() {
		let (mut dev, session) = scope();
		assert!(matches!(dev.turn_on(5), Err(Error::InvalidChannel{ channel: 5, max: 4, .. })));
		assert!(matches!(dev.set_channel_scale(0, 1.0), Err(Error::InvalidChannel{ .. })));
		assert!(matches!(dev.get_samples(5), Err(Error::InvalidChannel{ .. })));
		assert!(session.transcript().is_empty());
	}

	#[test]
	fn level_has_five_decimals() {
		let cmds = EdgeTrigger::new(1, 0.5).slope("rising").commands().unwrap();
		assert_eq!(cmds, vec![
			":TRIG:EDGE:SOUR CHAN1",
			":TRIG:EDGE:SWE SING",
			":TRIG:EDGE:COUP DC",
			":TRIG:EDGE:SLOP POS",
			":TRIG:EDGE:LEV 0.50000",
		]);
	}

	#[test]
	fn coupling_and_slope_ignore_case_and_space() {
		let cmds = EdgeTrigger::new(2, -1.25).coupling(" ac ").slope("FALLING ").trigger_type(" Single").commands().unwrap();
		assert_eq!(cmds[1], ":TRIG:EDGE:SWE SING");
		assert_eq!(cmds[2], ":TRIG:EDGE:COUP AC");
		assert_eq!(cmds[3], ":TRIG:EDGE:SLOP NEG");
		assert_eq!(cmds[4], ":TRIG:EDGE:LEV -1.25000");
	}

	#[test]
	fn bad_trigger_parameters_are_rejected() {
		assert!(matches!(EdgeTrigger::new(1, 0.0).coupling("GND").commands(), Err(Error::InvalidCoupling(_))));
		assert!(matches!(EdgeTrigger::new(1, 0.0).coupling("HF").commands(), Err(Error::InvalidCoupling(_))));
		assert!(matches!(EdgeTrigger::new(1, 0.0).slope("either").commands(), Err(Error::InvalidParameter{ name: "slope", .. })));
		assert!(matches!(EdgeTrigger::new(1, 0.0).trigger_type("normal").commands(), Err(Error::InvalidParameter{ .. })));
		assert!(matches!(EdgeTrigger::new(1, f64::NAN).commands(), Err(Error::InvalidParameter{ .. })));
	}

	#[test]
	fn invalid_trigger_sends_nothing() {
		let (mut dev, session) = scope();
		assert!(dev.configure_edge_trigger(&EdgeTrigger::new(1, 0.5).coupling("XY")).is_err());
		assert!(session.transcript().is_empty());
	}

	#[test]
	fn trigger_commands_are_each_verified() {
		let (mut dev, session) = scope();
		let reports = dev.configure_edge_trigger(&EdgeTrigger::new(3, 1.0)).unwrap();
		assert_eq!(reports.len(), 5);
		assert!(reports.iter().all(|r| r.is_ok()));

		let transcript = session.transcript();
		assert_eq!(transcript.len(), 10);
		assert!(transcript.iter().skip(1).step_by(2).all(|q| q == "SYST:ERR?"));
	}

	#[test]
	fn offset_is_read_from_waveform_y_origin() {
		let (mut dev, session) = scope();
		session.respond(":WAV:YOR?", "-2.500000e-01");
		assert_eq!(dev.get_channel_offset(2).unwrap(), -0.25);
		assert_eq!(session.transcript(), vec![":WAV:YOR?"]);
	}

	#[test]
	fn samples_are_pulled_in_ascii_raw_mode() {
		let (mut dev, session) = scope();
		session.respond(":WAV:DATA? CHAN2", "#9000000026 1.0e-01,2.0ee-01,bad,3.0e-01\n");

		let samples:Vec<f64> = dev.get_samples(2).unwrap().collect();
		assert_eq!(samples, vec![0.1, 0.2, 0.3]);
		assert_eq!(session.transcript(), vec![
			":WAV:FORM ASCII", "SYST:ERR?",
			":WAV:POIN:MODE RAW", "SYST:ERR?",
			":WAV:DATA? CHAN2",
		]);
	}

	#[test]
	fn rejected_transfer_mode_travels_with_samples() {
		let (mut dev, session) = scope();
		session.respond_once("SYST:ERR?", "-113,\"Undefined header\"");
		session.respond(":WAV:DATA? CHAN1", "#9000000015 1.0e-01,2.0e-01\n");

		let samples = dev.get_samples(1).unwrap();
		assert_eq!(samples.reports().len(), 2);
		assert_eq!(samples.reports()[0], ErrorReport::Error{ code: Some(-113), message: "Undefined header".to_owned() });
		assert!(samples.reports()[1].is_ok());
		assert_eq!(samples.collect::<Vec<f64>>(), vec![0.1, 0.2]);
	}

	#[test]
	fn scalar_getters() {
		let (mut dev, session) = scope();
		session.respond(":CHAN1:SCAL?", "5.000000e-01\n");
		session.respond(":ACQ:SAMP?", "1.000000e+09\n");
		session.respond(":CHAN4:DISP?", "0\n");

		assert_eq!(dev.get_channel_scale(1).unwrap(), 0.5);
		assert_eq!(dev.get_sample_rate().unwrap(), 1e9);
		assert!(!dev.is_enabled(4).unwrap());
	}

	#[test]
	fn setters_format_their_values() {
		let (mut dev, session) = scope();
		dev.set_channel_scale(1, 0.5).unwrap();
		dev.set_channel_offset(1, -1.5).unwrap();
		dev.set_timescale(0.001).unwrap();
		dev.set_trigger_offset(0.0).unwrap();
		dev.stop_capture().unwrap();

		let sent:Vec<String> = session.transcript().into_iter().filter(|c| c != "SYST:ERR?").collect();
		assert_eq!(sent, vec![":CHAN1:SCAL 0.5", ":CHAN1:OFFS -1.5", ":TIM:SCAL 0.001", ":TIM:OFFS 0", ":STOP"]);
	}

	#[test]
	fn grid_constants() {
		assert_eq!(Ds1054z::DIVS_VERTICAL, 8);
		assert_eq!(Ds1054z::DIVS_HORIZONTAL, 12);
	}
}
