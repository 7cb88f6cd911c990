pub mod fasta;
pub mod prj;
pub mod tables;
