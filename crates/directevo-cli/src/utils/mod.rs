pub mod io;
pub mod parser;
pub mod progress;
