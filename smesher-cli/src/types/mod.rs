//! Value types shared by the API client and the commands.

mod address;

pub use address::{decode_hex, Address, SmesherId, ADDRESS_LENGTH};
