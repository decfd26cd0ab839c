// The boundary to the instrument bus.
// Everything below Session and Bus (USB-TMC, VXI-11, ...) is a transport detail; the
// command engine and the instrument families only ever see these two traits.

use std::fmt;
use std::io;

pub mod mock;

// A bus resource found by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
	// Resource string, e.g. `USB0::0x1AB1::0x04CE::DS1ZA1234::INSTR`
	pub address: String,
	// Whatever the device said about itself, empty if the bus can't ask
	pub hint: String,
}

impl DeviceId {

	pub fn new(address:&str) -> Self { Self{ address: address.to_owned(), hint: String::new() } }

	pub fn with_hint(address:&str, hint:&str) -> Self { Self{ address: address.to_owned(), hint: hint.to_owned() } }

	pub fn contains(&self, token:&str) -> bool { self.address.contains(token) || self.hint.contains(token) }

}

impl fmt::Display for DeviceId {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result { f.write_str(&self.address) }
}

// A live connection to one device. Errors here are transport failures, never SCPI errors.
pub trait Session {
	fn write(&mut self, data:&[u8]) -> io::Result<()>;
	fn query(&mut self, data:&[u8]) -> io::Result<Vec<u8>>;
	fn close(&mut self) -> io::Result<()>;
}

pub trait Bus {
	// Substring every resource of this bus carries, e.g. `USB`
	fn class_marker(&self) -> &str;
	fn discover(&mut self) -> io::Result<Vec<DeviceId>>;
	fn open(&mut self, id:&DeviceId) -> io::Result<Box<dyn Session>>;
}

// Resources of this bus's transport class.
pub fn discover<B: Bus + ?Sized>(bus:&mut B) -> io::Result<Vec<DeviceId>> {
	let marker:String = bus.class_marker().to_owned();
	Ok(bus.discover()?.into_iter().filter(|id| id.address.contains(&marker)).collect())
}

#[cfg(test)]
mod tests {
	use super::*;
	use super::mock::{MockBus, MockSession};

	#[test]
	fn discovery_keeps_only_the_transport_class() {
		let mut bus = MockBus::new("USB");
		bus.attach(DeviceId::new("USB0::0x1AB1::0x0E11::DP8C1234::INSTR"), MockSession::new());
		bus.attach(DeviceId::new("ASRL1::INSTR"), MockSession::new());

		let found = discover(&mut bus).unwrap();
		assert_eq!(found, vec![DeviceId::new("USB0::0x1AB1::0x0E11::DP8C1234::INSTR")]);
	}

	#[test]
	fn hint_counts_towards_a_match() {
		let id = DeviceId::with_hint("TCPIP0::10.0.0.5::inst0::INSTR", "RIGOL TECHNOLOGIES,DP832,DP8C1234,00.01.14");
		assert!(id.contains("DP8"));
		assert!(!id.contains("DS1Z"));
		assert_eq!(id.to_string(), "TCPIP0::10.0.0.5::inst0::INSTR");
	}
}
