pub mod encode;
pub mod evolve;
