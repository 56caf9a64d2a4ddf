pub mod reverse_sweep;
pub mod srv;
pub mod zone_transfer;
