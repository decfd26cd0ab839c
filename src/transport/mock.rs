// Scripted stand-ins for a bus and its sessions.
// A MockSession is a cheap handle onto shared state, so a test can keep one clone to inspect
// the transcript after handing another to an instrument.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Error, ErrorKind};
use std::rc::Rc;
use std::str;

use super::{Bus, DeviceId, Session};

pub const NO_ERROR:&str = "0,\"No error\"";

#[derive(Default)]
struct State {
	transcript: Vec<String>,
	replies: HashMap<String, String>,
	once: HashMap<String, VecDeque<String>>,
	failing: bool,
	closed: usize,
}

#[derive(Clone)]
pub struct MockSession {
	state: Rc<RefCell<State>>,
}

fn text(data:&[u8]) -> io::Result<String> {
	str::from_utf8(data)
		.map(|s| s.to_owned())
		.map_err(|_| Error::new(ErrorKind::InvalidInput, "Command is not UTF-8"))
}

impl MockSession {

	// A session whose error queue is always empty
	pub fn new() -> Self {
		let session = Self{ state: Rc::new(RefCell::new(State::default())) };
		session.respond("SYST:ERR?", NO_ERROR);
		session
	}

	// Reply to `query` every time it is asked
	pub fn respond(&self, query:&str, reply:&str) -> &Self {
		self.state.borrow_mut().replies.insert(query.to_owned(), reply.to_owned());
		self
	}

	// Reply to the next `query` only; takes precedence over respond
	pub fn respond_once(&self, query:&str, reply:&str) -> &Self {
		self.state.borrow_mut().once.entry(query.to_owned()).or_default().push_back(reply.to_owned());
		self
	}

	// Make every subsequent exchange fail as if the cable was pulled
	pub fn disconnect(&self) { self.state.borrow_mut().failing = true; }

	// Every command and query in the order the device saw them
	pub fn transcript(&self) -> Vec<String> { self.state.borrow().transcript.clone() }

	pub fn close_count(&self) -> usize { self.state.borrow().closed }

	fn check_link(&self) -> io::Result<()> {
		if self.state.borrow().failing { Err(Error::new(ErrorKind::BrokenPipe, "Mock device disconnected")) }
		else { Ok(()) }
	}

}

impl Default for MockSession {
	fn default() -> Self { Self::new() }
}

impl Session for MockSession {

	fn write(&mut self, data:&[u8]) -> io::Result<()> {
		self.check_link()?;
		let cmd = text(data)?;
		self.state.borrow_mut().transcript.push(cmd);
		Ok(())
	}

	fn query(&mut self, data:&[u8]) -> io::Result<Vec<u8>> {
		self.check_link()?;
		let cmd = text(data)?;

		let mut state = self.state.borrow_mut();
		state.transcript.push(cmd.clone());

		let queued:Option<String> = state.once.get_mut(&cmd).and_then(|q| q.pop_front());
		match queued.or_else(|| state.replies.get(&cmd).cloned()) {
			Some(reply) => Ok(reply.into_bytes()),
			None => Err(Error::new(ErrorKind::TimedOut, format!("No scripted reply for {}", cmd))),
		}
	}

	fn close(&mut self) -> io::Result<()> {
		self.state.borrow_mut().closed += 1;
		Ok(())
	}

}

pub struct MockBus {
	marker: String,
	devices: Vec<(DeviceId, MockSession)>,
}

impl MockBus {

	pub fn new(marker:&str) -> Self { Self{ marker: marker.to_owned(), devices: vec![] } }

	pub fn attach(&mut self, id:DeviceId, session:MockSession) -> &mut Self {
		self.devices.push((id, session));
		self
	}

}

impl Bus for MockBus {

	fn class_marker(&self) -> &str { &self.marker }

	fn discover(&mut self) -> io::Result<Vec<DeviceId>> {
		Ok(self.devices.iter().map(|(id, _)| id.clone()).collect())
	}

	fn open(&mut self, id:&DeviceId) -> io::Result<Box<dyn Session>> {
		self.devices.iter()
			.find(|(known, _)| known == id)
			.map(|(_, session)| Box::new(session.clone()) as Box<dyn Session>)
			.ok_or_else(|| Error::new(ErrorKind::NotFound, format!("{} is not attached", id)))
	}

}
