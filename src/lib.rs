
// External data representation, a protocol for serializing data to be sent over the network
pub mod xdr;

// Remote procedure call, a protocol build on top of XDR to provide something like C-style function calls over the network
pub mod rpc;

// A protocol using RPC that's meant to communicate with instruments like oscilloscopes and power supplies over the LAN
pub mod vxi11;

// What the rest of the crate needs from an instrument bus, whichever one it is
pub mod transport;

// Write a command, then ask the instrument whether it liked it
pub mod engine;

// Instrument families and their command sets
pub mod devices;

pub mod config;
pub mod error;

pub use error::{Error, Result};
pub use engine::{Delays, Engine, ErrorReport};
pub use devices::Instrument;
pub use devices::dp832::Dp832;
pub use devices::ds1054z::Ds1054z;
