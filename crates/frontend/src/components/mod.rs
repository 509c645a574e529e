pub mod facility_table;
pub mod filter_selector;
pub mod legend;
pub mod map_view;
