pub mod gandyam;
pub mod ria;
