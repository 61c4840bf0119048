pub mod memory;

pub use memory::Cli;
pub use memory::run;
