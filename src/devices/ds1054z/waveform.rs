// Decoding of `:WAV:DATA?` replies in ASCII mode.
// The reply is a comma separated list of values where the first token still carries the
// definite-length block header (`#9000001200-1.234e-01`). Long captures occasionally contain a
// mangled token, which is dropped with a warning so the rest of the capture stays usable.

use std::iter::Enumerate;
use std::vec::IntoIter;

use log::warn;

use crate::engine::ErrorReport;

// `#`, the digit count and nine length digits
pub const BLOCK_HEADER_LEN:usize = 11;

pub fn tokenize(reply:&str) -> Vec<String> {
	reply.split(',').map(|s| s.to_owned()).collect()
}

pub fn decode_token(token:&str) -> Option<f64> {
	let trimmed:&str = token.trim();
	if trimmed.is_empty() {
		warn!("Dropped empty sample");
		return None;
	}

	let body:&str = if trimmed.starts_with('#') { trimmed.get(BLOCK_HEADER_LEN..).unwrap_or("") } else { trimmed };

	// A doubled exponent marker turns up now and then
	let fixed:String = body.trim().replace("ee", "e").replace("EE", "E");

	match fixed.parse::<f64>() {
		Ok(x) => Some(x),
		Err(_) => {
			warn!("Dropped malformed sample {:?}", token);
			None
		}
	}
}

// Samples of one capture, decoded as they are pulled. Dropped tokens leave no gap.
pub struct Samples {
	tokens: Enumerate<IntoIter<String>>,
	// What the scope said about the transfer-mode commands sent before the data query
	reports: Vec<ErrorReport>,
}

impl Samples {

	pub fn from_reply(reply:&str) -> Self { Self::from_tokens(tokenize(reply)) }

	pub fn from_tokens(tokens:Vec<String>) -> Self { Self{ tokens: tokens.into_iter().enumerate(), reports: vec![] } }

	pub fn with_reports(mut self, reports:Vec<ErrorReport>) -> Self {
		self.reports = reports;
		self
	}

	pub fn reports(&self) -> &[ErrorReport] { &self.reports }

	// Pairs each sample with the position of its token in the reply, so gaps left by dropped
	// tokens stay visible
	pub fn indexed(self) -> Indexed { Indexed{ inner: self } }

	fn next_indexed(&mut self) -> Option<(usize, f64)> {
		for (idx, token) in &mut self.tokens {
			if let Some(x) = decode_token(&token) { return Some((idx, x)); }
		}
		None
	}

}

impl Iterator for Samples {
	type Item = f64;

	fn next(&mut self) -> Option<f64> { self.next_indexed().map(|(_, x)| x) }

	fn size_hint(&self) -> (usize, Option<usize>) { (0, self.tokens.size_hint().1) }
}

pub struct Indexed {
	inner: Samples,
}

impl Iterator for Indexed {
	type Item = (usize, f64);

	fn next(&mut self) -> Option<(usize, f64)> { self.inner.next_indexed() }

	fn size_hint(&self) -> (usize, Option<usize>) { self.inner.size_hint() }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(list:&[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

	#[test]
	fn malformed_tokens_are_dropped() {
		let samples:Vec<f64> = Samples::from_tokens(tokens(&["#800000005", "1.23", "", "4.5ee6", "bad"])).collect();
		assert_eq!(samples, vec![1.23, 4.5e6]);
	}

	#[test]
	fn block_header_is_stripped_from_first_token() {
		let reply = "#9000000036-1.200000e-01,4.000000e-02,8.000000e-02\n";
		let samples:Vec<f64> = Samples::from_reply(reply).collect();
		assert_eq!(samples, vec![-0.12, 0.04, 0.08]);
	}

	#[test]
	fn good_samples_keep_their_order() {
		let list = ["1", "x", "2", " ", "3", "4e", "5", "1.0e-3ee"];
		let samples:Vec<f64> = Samples::from_tokens(tokens(&list)).collect();
		assert_eq!(samples, vec![1.0, 2.0, 3.0, 5.0]);
	}

	#[test]
	fn indexed_samples_show_gaps() {
		let pairs:Vec<(usize, f64)> = Samples::from_reply("1.0,,oops,4.0").indexed().collect();
		assert_eq!(pairs, vec![(0, 1.0), (3, 4.0)]);
	}

	#[test]
	fn header_only_token_is_dropped() {
		assert_eq!(decode_token("#9000"), None);
		assert_eq!(decode_token("  2.5e-3 "), Some(2.5e-3));
	}

	#[test]
	fn empty_reply_decodes_to_nothing() {
		assert_eq!(Samples::from_reply("").count(), 0);
	}
}
