// ONC RPC (RFC 5531) client side, just enough to reach the VXI-11 core channel

use std::io::{self, Error, ErrorKind};

use crate::xdr::{Packer, Unpacker};

pub const RPCVERSION:u32 = 2;

pub const CALL:i32  = 0;
pub const REPLY:i32 = 1;

pub const MSG_ACCEPTED:i32 = 0;
pub const MSG_DENIED:i32   = 1;

pub const RPC_MISMATCH:i32 = 0;
pub const AUTH_ERROR:i32   = 1;

pub const SUCCESS:i32       = 0;      // RPC executed successfully
pub const PROG_UNAVAIL:i32  = 1;      // remote hasn't exported program
pub const PROG_MISMATCH:i32 = 2;      // remote can't support version #
pub const PROC_UNAVAIL:i32  = 3;      // program can't support procedure
pub const GARBAGE_ARGS:i32  = 4;      // procedure can't decode params

pub const IPPROTO_TCP:u32 = 6;

pub const AUTH_NONE:i32 = 0;

pub mod port_mapping;
pub mod tcp;

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::Other, msg) }

pub fn pack_call_header(packer:&mut Packer, xid:u32, prog:u32, vers:u32, prc:u32) -> io::Result<()> {
	packer.pack_u32(xid)?;
	packer.pack_enum(CALL)?;
	packer.pack_u32(RPCVERSION)?;
	packer.pack_u32(prog)?;
	packer.pack_u32(vers)?;
	packer.pack_u32(prc)?;

	// Credentials and verifier, both AUTH_NONE with an empty body
	for _ in 0..2 {
		packer.pack_enum(AUTH_NONE)?;
		packer.pack_variable_len_opaque(&[])?;
	}
	Ok(())
}

// Consumes an accepted, successful reply header and returns its xid
pub fn unpack_reply_header(unpacker:&mut Unpacker) -> io::Result<u32> {
	let xid:u32 = unpacker.unpack_u32()?;

	if unpacker.unpack_enum()? != REPLY { return Err(err("Expected a REPLY message")); }

	match unpacker.unpack_enum()? {
		MSG_ACCEPTED => { },
		MSG_DENIED   => return match unpacker.unpack_enum()? {
			RPC_MISMATCH => Err(err("RPC call denied: RPC version mismatch")),
			AUTH_ERROR   => Err(err("RPC call denied: authentication error")),
			_            => Err(err("RPC call denied for an unknown reason")),
		},
		_ => return Err(err("Reply was neither accepted nor denied")),
	}

	// Verifier, ignored
	unpacker.unpack_enum()?;
	unpacker.unpack_variable_len_opaque()?;

	match unpacker.unpack_enum()? {
		SUCCESS       => Ok(xid),
		PROG_UNAVAIL  => Err(err("RPC program unavailable")),
		PROG_MISMATCH => Err(err("RPC program version mismatch")),
		PROC_UNAVAIL  => Err(err("RPC procedure unavailable")),
		GARBAGE_ARGS  => Err(err("RPC server could not decode the arguments")),
		_             => Err(err("RPC call failed for an unknown reason")),
	}
}
