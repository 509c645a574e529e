//! Map engine: a retained slippy-map model plus the managers that keep its
//! marker and choropleth layers in step with the facility data.

pub mod cluster;
pub mod config;
pub mod controller;
pub mod lifecycle;
pub mod markers;
pub mod overlay;
pub mod projection;
pub mod widget;
