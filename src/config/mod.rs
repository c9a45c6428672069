pub mod params;
pub mod settings;
