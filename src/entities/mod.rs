pub mod light;
pub mod sensor;
