// VXI-11 core channel, the LAN flavour of the instrument bus

use std::io::{self, Error, ErrorKind};
use std::str;
use std::time::Duration;

use log::{info, warn};

use crate::rpc::port_mapping::TcpPortMapperClient;
use crate::rpc::tcp::TcpClient;
use crate::transport::{Bus, DeviceId, Session};

// Device core
pub const DEVICE_CORE_PROG:u32  = 0x0607af;
pub const DEVICE_CORE_VERS:u32  = 1;
pub const CREATE_LINK:u32       = 10;
pub const DEVICE_WRITE:u32      = 11;
pub const DEVICE_READ:u32       = 12;
pub const DESTROY_LINK:u32      = 23;

pub const CLIENT_ID:i32 = 3333;
pub const DEFAULT_LOCK_TIMEOUT_MS:u32 = 10000;

pub const OPERATION_FLAGS_END_ONLY:i32 = 8;

// Bits of the reason field of a device_read reply
pub const REASON_REQCNT:i32 = 1;
pub const REASON_CHR:i32    = 2;
pub const REASON_END:i32    = 4;

pub const CLASS_MARKER:&str = "TCPIP";

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::Other, msg) }

fn device_error(code:i32) -> io::Result<()> {
	match code {
		0  => Ok(()),
		1  => Err(err("Syntax error")),
		3  => Err(err("Device not accessible")),
		4  => Err(Error::new(ErrorKind::NotConnected, "Invalid link identifier")),
		5  => Err(err("Parameter error")),
		9  => Err(err("Out of resources")),
		11 => Err(err("Device locked by another link")),
		15 => Err(Error::new(ErrorKind::TimedOut, "I/O timeout")),
		17 => Err(err("I/O error")),
		21 => Err(err("Invalid address")),
		23 => Err(Error::new(ErrorKind::Interrupted, "Abort")),
		_  => Err(err("Unknown VXI-11 device error")),
	}
}

pub fn resource_address(host:&str) -> String { format!("{}0::{}::inst0::INSTR", CLASS_MARKER, host) }

fn host_of(address:&str) -> Option<&str> {
	let mut parts = address.split("::");
	match (parts.next(), parts.next()) {
		(Some(class), Some(host)) if class.starts_with(CLASS_MARKER) => Some(host),
		_ => None,
	}
}

// Pieces of a write no larger than the device will accept in one device_write.
// A device that reports a max_recv_size of zero takes the whole message.
fn fragments(data:&[u8], max_recv_size:u32) -> Vec<&[u8]> {
	if data.is_empty() || max_recv_size == 0 { return vec![data]; }
	data.chunks(max_recv_size as usize).collect()
}

pub struct Link {
	pub link_id: i32,
	pub max_recv_size: u32,
}

pub struct CoreClient {
	client: TcpClient,
	io_timeout_ms: u32,
	opt_link: Option<Link>,
}

impl CoreClient {

	pub fn new(host:&str, io_timeout:Duration) -> io::Result<Self> {
		let socket_timeout = Some(io_timeout + Duration::from_secs(1));

		// Find the port to use for the core program
		let port:u16 = TcpPortMapperClient::new(host, socket_timeout)?.get_port(DEVICE_CORE_PROG, DEVICE_CORE_VERS)?;

		let client = TcpClient::connect((host, port), DEVICE_CORE_PROG, DEVICE_CORE_VERS, socket_timeout)?;
		let io_timeout_ms = io_timeout.as_millis().min(u32::MAX as u128) as u32;

		Ok(Self{ client, io_timeout_ms, opt_link: None })
	}

	fn link_id(&self) -> io::Result<i32> {
		self.opt_link.as_ref().map(|l| l.link_id).ok_or_else(|| Error::new(ErrorKind::NotConnected, "No link"))
	}

	pub fn create_link(&mut self) -> io::Result<()> {
		if self.opt_link.is_some() { return Err(err("Already connected to a link")); }

		self.client.start_call(CREATE_LINK)?;
		self.client.packer.pack_i32(CLIENT_ID)?;
		self.client.packer.pack_bool(false)?;
		self.client.packer.pack_u32(DEFAULT_LOCK_TIMEOUT_MS)?;
		self.client.packer.pack_variable_len_opaque(b"inst0")?;
		self.client.do_call()?;

		let error:i32         = self.client.unpacker.unpack_i32()?;
		let link_id:i32       = self.client.unpacker.unpack_i32()?;
		let _abort_port:u32   = self.client.unpacker.unpack_u32()?;
		let max_recv_size:u32 = self.client.unpacker.unpack_u32()?;

		device_error(error)?;
		self.opt_link = Some(Link{ link_id, max_recv_size });
		Ok(())
	}

	pub fn write(&mut self, data:&[u8]) -> io::Result<()> {
		let link_id:i32 = self.link_id()?;
		let max_recv_size:u32 = self.opt_link.as_ref().map_or(0, |l| l.max_recv_size);

		let pieces:Vec<&[u8]> = fragments(data, max_recv_size);
		let last:usize = pieces.len() - 1;

		for (i, piece) in pieces.into_iter().enumerate() {
			// Only the final piece carries END
			let flags:i32 = if i == last { OPERATION_FLAGS_END_ONLY } else { 0 };

			self.client.start_call(DEVICE_WRITE)?;
			self.client.packer.pack_i32(link_id)?;
			self.client.packer.pack_u32(self.io_timeout_ms)?;
			self.client.packer.pack_u32(DEFAULT_LOCK_TIMEOUT_MS)?;
			self.client.packer.pack_i32(flags)?;
			self.client.packer.pack_variable_len_opaque(piece)?;
			self.client.do_call()?;

			let error:i32 = self.client.unpacker.unpack_i32()?;
			let size:u32  = self.client.unpacker.unpack_u32()?;
			device_error(error)?;

			if size as usize != piece.len() {
				return Err(err("Number of bytes in confirmation doesn't match number of bytes sent"));
			}
		}
		Ok(())
	}

	// Keeps reading until the device flags the end of the message
	pub fn read(&mut self) -> io::Result<Vec<u8>> {
		let link_id:i32 = self.link_id()?;
		let mut ans:Vec<u8> = vec![];

		loop {
			self.client.start_call(DEVICE_READ)?;
			self.client.packer.pack_i32(link_id)?;
			self.client.packer.pack_u32(u32::MAX)?;
			self.client.packer.pack_u32(self.io_timeout_ms)?;
			self.client.packer.pack_u32(DEFAULT_LOCK_TIMEOUT_MS)?;
			self.client.packer.pack_i32(0)?;
			self.client.packer.pack_i32(0)?;
			self.client.do_call()?;

			let error:i32    = self.client.unpacker.unpack_i32()?;
			let reason:i32   = self.client.unpacker.unpack_i32()?;
			let data:Vec<u8> = self.client.unpacker.unpack_variable_len_opaque()?;
			device_error(error)?;

			ans.extend_from_slice(&data);

			if reason & REASON_END != 0 { return Ok(ans); }
			if reason & (REASON_REQCNT | REASON_CHR) == 0 && data.is_empty() {
				return Err(err("device_read returned no data and no reason"));
			}
		}
	}

	pub fn ask(&mut self, data:&[u8]) -> io::Result<Vec<u8>> {
		self.write(data)?;
		self.read()
	}

	pub fn destroy_link(&mut self) -> io::Result<()> {
		let link_id:i32 = self.link_id()?;

		self.client.start_call(DESTROY_LINK)?;
		self.client.packer.pack_i32(link_id)?;
		self.client.do_call()?;

		self.opt_link = None;
		device_error(self.client.unpacker.unpack_i32()?)
	}

}

impl Session for CoreClient {

	fn write(&mut self, data:&[u8]) -> io::Result<()> { CoreClient::write(self, data) }
	fn query(&mut self, data:&[u8]) -> io::Result<Vec<u8>> { self.ask(data) }
	fn close(&mut self) -> io::Result<()> { self.destroy_link() }

}

// Instruments on the LAN can't be enumerated without broadcast RPC, so discovery probes a known host list
pub struct Vxi11Bus {
	hosts: Vec<String>,
	io_timeout: Duration,
}

impl Vxi11Bus {

	pub fn new(hosts:Vec<String>, io_timeout:Duration) -> Self { Self{ hosts, io_timeout } }

	fn probe(&self, host:&str) -> io::Result<DeviceId> {
		let mut core = CoreClient::new(host, self.io_timeout)?;
		core.create_link()?;
		let idn = core.ask(b"*IDN?");
		core.destroy_link()?;

		let idn:Vec<u8> = idn?;
		let hint:String = str::from_utf8(&idn)
			.map_err(|_| Error::new(ErrorKind::InvalidData, "Received a response to *IDN? but unable to interpret as UTF-8"))?
			.trim()
			.to_owned();

		Ok(DeviceId{ address: resource_address(host), hint })
	}

}

impl Bus for Vxi11Bus {

	fn class_marker(&self) -> &str { CLASS_MARKER }

	fn discover(&mut self) -> io::Result<Vec<DeviceId>> {
		let mut ans:Vec<DeviceId> = vec![];
		for host in &self.hosts {
			match self.probe(host) {
				Ok(id) => ans.push(id),
				Err(e) => warn!("No VXI-11 instrument answering at {}: {}", host, e),
			}
		}
		Ok(ans)
	}

	fn open(&mut self, id:&DeviceId) -> io::Result<Box<dyn Session>> {
		let host:&str = host_of(&id.address)
			.ok_or_else(|| Error::new(ErrorKind::InvalidInput, format!("{} is not a VXI-11 resource", id.address)))?;

		let mut core = CoreClient::new(host, self.io_timeout)?;
		core.create_link()?;
		info!("Created VXI-11 link to {}", host);

		Ok(Box::new(core))
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resource_address_round_trips_to_host() {
		let address = resource_address("192.168.2.4");
		assert_eq!(address, "TCPIP0::192.168.2.4::inst0::INSTR");
		assert_eq!(host_of(&address), Some("192.168.2.4"));
	}

	#[test]
	fn usb_resources_have_no_host() {
		assert_eq!(host_of("USB0::0x1AB1::0x04CE::DS1ZA1234::INSTR"), None);
	}

	#[test]
	fn writes_are_split_at_max_recv_size() {
		let data:&[u8] = b":WAV:FORM ASCII";
		assert_eq!(fragments(data, 4), vec![&b":WAV"[..], &b":FOR"[..], &b"M AS"[..], &b"CII"[..]]);
		assert_eq!(fragments(data, 1024), vec![data]);
		assert_eq!(fragments(data, 0), vec![data]);
		assert_eq!(fragments(b"", 4), vec![&b""[..]]);
	}

	#[test]
	fn device_errors_map_to_io_kinds() {
		assert!(device_error(0).is_ok());
		assert_eq!(device_error(15).unwrap_err().kind(), ErrorKind::TimedOut);
		assert_eq!(device_error(4).unwrap_err().kind(), ErrorKind::NotConnected);
	}
}
