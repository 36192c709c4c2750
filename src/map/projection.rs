use glam::DVec2;
use std::f64::consts::PI;

/// Robinson table, 5° latitude steps from 0° to 90°: parallel length
const ROBINSON_X: [f64; 19] = [
    1.0000, 0.9986, 0.9954, 0.9900, 0.9822, 0.9730, 0.9600, 0.9427, 0.9216, 0.8962, 0.8679,
    0.8350, 0.7986, 0.7597, 0.7186, 0.6732, 0.6213, 0.5722, 0.5322,
];

/// Robinson table: distance of the parallel from the equator
const ROBINSON_Y: [f64; 19] = [
    0.0000, 0.0620, 0.1240, 0.1860, 0.2480, 0.3100, 0.3720, 0.4340, 0.4958, 0.5571, 0.6176,
    0.6769, 0.7346, 0.7903, 0.8435, 0.8936, 0.9394, 0.9761, 1.0000,
];

const X_SCALE: f64 = 0.8487;
const Y_SCALE: f64 = 1.3523;

/// Half extents of the projected world on the unit sphere
pub const WORLD_HALF_WIDTH: f64 = X_SCALE * PI;
pub const WORLD_HALF_HEIGHT: f64 = Y_SCALE;

/// Table lookup for |lat| in degrees: (X, Y)
#[inline(always)]
fn robinson_coeffs(lat_abs: f64) -> (f64, f64) {
    let lat_abs = lat_abs.clamp(0.0, 90.0);
    let idx = ((lat_abs / 5.0).floor() as usize).min(17);
    let t = (lat_abs - idx as f64 * 5.0) / 5.0;
    let x = ROBINSON_X[idx] + (ROBINSON_X[idx + 1] - ROBINSON_X[idx]) * t;
    let y = ROBINSON_Y[idx] + (ROBINSON_Y[idx + 1] - ROBINSON_Y[idx]) * t;
    (x, y)
}

/// Forward Robinson projection (degrees in, unit-sphere plane out, y up)
pub fn robinson(lon: f64, lat: f64) -> DVec2 {
    let (x, y) = robinson_coeffs(lat.abs());
    DVec2::new(
        X_SCALE * x * lon.to_radians(),
        Y_SCALE * y * lat.signum(),
    )
}

/// Latitude of a projected y; `None` beyond the poles
fn lat_for_y(y: f64) -> Option<f64> {
    let ny = y.abs() / Y_SCALE;
    if ny > 1.0 {
        return None;
    }
    let idx = ROBINSON_Y
        .windows(2)
        .position(|w| ny <= w[1])
        .unwrap_or(17);
    let span = ROBINSON_Y[idx + 1] - ROBINSON_Y[idx];
    let t = (ny - ROBINSON_Y[idx]) / span;
    Some((idx as f64 + t) * 5.0 * y.signum())
}

/// Inverse Robinson projection; `None` outside the world outline
pub fn inverse_robinson(p: DVec2) -> Option<(f64, f64)> {
    let lat = lat_for_y(p.y)?;
    let (x, _) = robinson_coeffs(lat.abs());
    let lon = (p.x / (X_SCALE * x)).to_degrees();
    if lon.abs() > 180.0 {
        return None;
    }
    Some((lon, lat))
}

/// Viewport over the Robinson plane: center, zoom and pixel size
#[derive(Clone)]
pub struct Viewport {
    /// Center in projected plane coordinates
    pub center: DVec2,
    /// Zoom level (1.0 = whole world fits the width)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center: robinson(center_lon, center_lat),
            zoom,
            width,
            height,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 0.0, 1.0, width, height)
    }

    /// Pixels per plane unit
    #[inline(always)]
    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64 / (2.0 * WORLD_HALF_WIDTH)
    }

    fn half_size(&self) -> DVec2 {
        DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Plane point to screen pixel
    #[inline(always)]
    pub fn plane_to_screen(&self, p: DVec2) -> (i32, i32) {
        let d = (p - self.center) * self.scale();
        let half = self.half_size();
        ((half.x + d.x) as i32, (half.y - d.y) as i32)
    }

    /// Screen pixel to plane point
    pub fn screen_to_plane(&self, px: i32, py: i32) -> DVec2 {
        let half = self.half_size();
        let d = DVec2::new(px as f64 - half.x, half.y - py as f64) / self.scale();
        self.center + d
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        self.plane_to_screen(robinson(lon, lat))
    }

    /// Unproject pixel coordinates back to (lon, lat); `None` off the globe
    pub fn unproject(&self, px: i32, py: i32) -> Option<(f64, f64)> {
        inverse_robinson(self.screen_to_plane(px, py))
    }

    /// Center as (lon, lat)
    pub fn center_lonlat(&self) -> (f64, f64) {
        inverse_robinson(self.center).unwrap_or((0.0, 0.0))
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.scale();
        self.center.x += dx as f64 / scale;
        self.center.y -= dy as f64 / scale;
        self.center = self.center.clamp(
            DVec2::new(-WORLD_HALF_WIDTH, -WORLD_HALF_HEIGHT),
            DVec2::new(WORLD_HALF_WIDTH, WORLD_HALF_HEIGHT),
        );
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(50.0);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(0.5);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor, keeping the plane point under the cursor fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.screen_to_plane(px, py);
        self.zoom = (self.zoom * factor).clamp(0.5, 50.0);

        let half = self.half_size();
        let offset = DVec2::new(px as f64 - half.x, half.y - py as f64) / self.scale();
        self.center = anchor - offset;
    }

    /// Conservative (min_lon, min_lat, max_lon, max_lat) of the visible area.
    /// Latitude depends only on y in Robinson, and the widest longitude span
    /// for a given x range sits at the shortest parallel in view.
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let top_left = self.screen_to_plane(0, 0);
        let bottom_right = self.screen_to_plane(self.width as i32, self.height as i32);

        let y_hi = top_left.y.clamp(-WORLD_HALF_HEIGHT, WORLD_HALF_HEIGHT);
        let y_lo = bottom_right.y.clamp(-WORLD_HALF_HEIGHT, WORLD_HALF_HEIGHT);
        let max_lat = lat_for_y(y_hi).unwrap_or(90.0);
        let min_lat = lat_for_y(y_lo).unwrap_or(-90.0);

        // Parallel lengths at the extremes of the latitude range
        let widest = if min_lat <= 0.0 && max_lat >= 0.0 {
            1.0
        } else {
            robinson_coeffs(min_lat.abs().min(max_lat.abs())).0
        };
        let narrowest = robinson_coeffs(min_lat.abs().max(max_lat.abs())).0;

        let lon_at = |x: f64, parallel: f64| (x / (X_SCALE * parallel)).to_degrees();
        let candidates = [
            lon_at(top_left.x, widest),
            lon_at(top_left.x, narrowest),
            lon_at(bottom_right.x, widest),
            lon_at(bottom_right.x, narrowest),
        ];
        let min_lon = candidates.iter().copied().fold(f64::MAX, f64::min);
        let max_lon = candidates.iter().copied().fold(f64::MIN, f64::max);

        (
            min_lon.clamp(-180.0, 180.0),
            min_lat,
            max_lon.clamp(-180.0, 180.0),
            max_lat,
        )
    }

    /// Check if a pixel bounding box might be visible
    pub fn box_might_be_visible(&self, min: (i32, i32), max: (i32, i32)) -> bool {
        max.0 >= 0 && min.0 < self.width as i32 && max.1 >= 0 && min.1 < self.height as i32
    }
}
