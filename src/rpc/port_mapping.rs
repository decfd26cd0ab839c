
use std::io::{self, Error, ErrorKind};
use std::net::ToSocketAddrs;
use std::time::Duration;

use super::IPPROTO_TCP;
use super::tcp::TcpClient;

pub const PMAP_PROG:u32 = 100000;
pub const PMAP_VERS:u32 = 2;
pub const PMAP_PORT:u16 = 111;

pub const PMAPPROC_GETPORT:u32 = 3;     // (mapping) -> unsigned int

pub struct TcpPortMapperClient {
	client: TcpClient,
}

impl TcpPortMapperClient {

	pub fn new(host:&str, timeout:Option<Duration>) -> io::Result<Self> {
		Self::connect((host, PMAP_PORT), timeout)
	}

	pub fn connect<A: ToSocketAddrs>(addr:A, timeout:Option<Duration>) -> io::Result<Self> {
		Ok(Self{ client: TcpClient::connect(addr, PMAP_PROG, PMAP_VERS, timeout)? })
	}

	// Port of a TCP program, zero if it isn't registered
	pub fn get_port(&mut self, program:u32, version:u32) -> io::Result<u16> {
		self.client.start_call(PMAPPROC_GETPORT)?;
		self.client.packer.pack_u32(program)?;
		self.client.packer.pack_u32(version)?;
		self.client.packer.pack_u32(IPPROTO_TCP)?;
		self.client.packer.pack_u32(0)?;
		self.client.do_call()?;

		let port:u32 = self.client.unpacker.unpack_u32()?;

		if !self.client.unpacker.all_data_consumed() {
			return Err(Error::new(ErrorKind::InvalidData, "Data unexpectedly left over after unpacking port"));
		}
		if port == 0 || port > u16::MAX as u32 {
			return Err(Error::new(ErrorKind::NotFound, format!("Program {:#x} is not registered with the port mapper", program)));
		}

		Ok(port as u16)
	}

}
