pub mod colors;
pub mod models;
pub mod ratios;
pub mod validation;
pub mod wkt;
