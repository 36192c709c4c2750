//! Terminal choropleth of cattle-driven deforestation risk by country.

pub mod app;
pub mod braille;
pub mod data;
pub mod error;
pub mod figure;
pub mod map;
pub mod risk;
pub mod ui;
