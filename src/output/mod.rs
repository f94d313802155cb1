mod presenter;
mod table;

pub use presenter::*;
