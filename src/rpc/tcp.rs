
use std::io::{self, Read, Write, Error, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};
use log::debug;

use crate::xdr::{Packer, Unpacker};
use super::{pack_call_header, unpack_reply_header};

const LAST_FRAGMENT:u32 = 0x8000_0000;

pub struct TcpClient {
	stream: TcpStream,
	prog: u32,
	vers: u32,
	lastxid: u32,
	pub packer: Packer,
	pub unpacker: Unpacker,
}

impl TcpClient {

	pub fn connect<A: ToSocketAddrs>(addr:A, prog:u32, vers:u32, timeout:Option<Duration>) -> io::Result<Self> {
		let stream = TcpStream::connect(addr)?;
		stream.set_read_timeout(timeout)?;
		stream.set_write_timeout(timeout)?;

		// Random starting xid so replies left over from an earlier session can't be mistaken for ours
		let lastxid:u32 = rand::random();

		Ok(Self{ stream, prog, vers, lastxid, packer: Packer::new(), unpacker: Unpacker::new() })
	}

	// Resets the packer and writes the call header, leaving the arguments to the caller
	pub fn start_call(&mut self, prc:u32) -> io::Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		pack_call_header(&mut self.packer, self.lastxid, self.prog, self.vers, prc)
	}

	// Sends whatever is in the packer as one record and loads the matching reply body into the unpacker
	pub fn do_call(&mut self) -> io::Result<()> {
		let call:&[u8] = self.packer.as_bytes();

		let mut send_bytes:Vec<u8> = Vec::with_capacity(call.len() + 4);
		send_bytes.write_u32::<BigEndian>(call.len() as u32 | LAST_FRAGMENT)?;
		send_bytes.extend_from_slice(call);
		self.stream.write_all(&send_bytes)?;

		loop {
			let reply:Vec<u8> = self.read_record()?;
			self.unpacker.reset(&reply);

			let xid:u32 = unpack_reply_header(&mut self.unpacker)?;
			if xid == self.lastxid { return Ok(()); }

			debug!("Discarding stale RPC reply with xid {} while waiting for {}", xid, self.lastxid);
		}
	}

	fn read_record(&mut self) -> io::Result<Vec<u8>> {
		let mut record:Vec<u8> = vec![];

		loop {
			let marker:u32 = self.stream.read_u32::<BigEndian>()?;
			let n = (marker & !LAST_FRAGMENT) as usize;

			let start = record.len();
			record.resize(start + n, 0);
			self.stream.read_exact(&mut record[start..])?;

			if marker & LAST_FRAGMENT != 0 { return Ok(record); }
			if n == 0 { return Err(Error::new(ErrorKind::InvalidData, "Empty non-final RPC record fragment")); }
		}
	}

}
