pub mod bcktab;
pub mod bentsedg;
pub mod blindtrie;
pub mod lcp;
pub mod options;
pub mod partssuf;
pub mod run;
pub mod suffixer;
