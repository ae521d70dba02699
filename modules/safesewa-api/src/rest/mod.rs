pub mod alerts;
pub mod sos;
