mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use projection::{inverse_robinson, robinson, Viewport};
pub use renderer::{country_at, ChoroplethRenderer, DisplaySettings, Fill, MapLayers};
pub use spatial::{Bbox, BboxGrid};
