pub mod data_type;
pub mod params;
pub mod sink;
pub mod utils;
