pub mod record;
pub mod shared;
