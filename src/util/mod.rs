pub mod dna;
pub mod timer;
