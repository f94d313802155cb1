mod client;
mod decoder;
mod session;
mod transport;
mod validator;

pub use client::*;
pub use decoder::*;
pub use session::*;
pub use transport::*;
pub use validator::*;
