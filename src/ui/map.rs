use std::collections::HashMap;
use std::ops::Range;

use eframe::egui::{self, Color32, ColorImage, Pos2, Rect, Sense, TextureHandle, Ui, Vec2};
use geo::{BoundingRect, Contains, Coord, Point, Simplify};

use crate::color::{ylorrd, NO_DATA};
use crate::data::aggregate::UnitTotal;
use crate::data::boundary::BoundaryFeature;
use crate::state::AppState;

/// Longest side of the rasterized map, in pixels.
const RASTER_SIDE: usize = 1400;

// ---------------------------------------------------------------------------
// Projection: lon/lat → raster pixels
// ---------------------------------------------------------------------------

/// Equirectangular projection with the x axis shrunk by cos(mid-latitude),
/// fitted so the longest side spans `max_side` pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    min_x: f64,
    max_y: f64,
    sx: f64,
    sy: f64,
    pub width: usize,
    pub height: usize,
}

impl Projection {
    pub fn fit(bounds: geo::Rect<f64>, max_side: usize) -> Option<Self> {
        let kx = ((bounds.min().y + bounds.max().y) / 2.0).to_radians().cos();
        let world_w = bounds.width() * kx;
        let world_h = bounds.height();
        if !(world_w > 0.0 && world_h > 0.0) {
            return None;
        }
        let scale = max_side as f64 / world_w.max(world_h);
        Some(Self {
            min_x: bounds.min().x,
            max_y: bounds.max().y,
            sx: scale * kx,
            sy: scale,
            width: ((world_w * scale).round() as usize).max(1),
            height: ((world_h * scale).round() as usize).max(1),
        })
    }

    pub fn to_pixel(&self, coord: Coord<f64>) -> [f64; 2] {
        [(coord.x - self.min_x) * self.sx, (self.max_y - coord.y) * self.sy]
    }

    pub fn to_world(&self, px: f64, py: f64) -> Point<f64> {
        Point::new(self.min_x + px / self.sx, self.max_y - py / self.sy)
    }

    /// Half a pixel in degrees of latitude.
    fn half_pixel(&self) -> f64 {
        0.5 / self.sy
    }
}

// ---------------------------------------------------------------------------
// Coverage grid: which feature owns each pixel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CoverageGrid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Option<u32>>,
}

/// Assign every pixel whose centre lies inside a feature (holes excluded).
/// Outlines are first simplified to half a pixel. Later features overwrite
/// earlier ones.
pub fn rasterize(features: &[BoundaryFeature], projection: &Projection) -> CoverageGrid {
    let (width, height) = (projection.width, projection.height);
    let mut cells = vec![None; width * height];
    let tolerance = projection.half_pixel();

    for (index, feature) in features.iter().enumerate() {
        for polygon in &feature.shape.0 {
            let polygon = polygon.simplify(&tolerance);
            let Some(extent) = polygon.bounding_rect() else {
                continue;
            };
            let [left, top] = projection.to_pixel(Coord {
                x: extent.min().x,
                y: extent.max().y,
            });
            let [right, bottom] = projection.to_pixel(Coord {
                x: extent.max().x,
                y: extent.min().y,
            });

            for py in centre_span(top, bottom, height) {
                for px in centre_span(left, right, width) {
                    let centre = projection.to_world(px as f64 + 0.5, py as f64 + 0.5);
                    if polygon.contains(&centre) {
                        cells[py * width + px] = Some(index as u32);
                    }
                }
            }
        }
    }

    CoverageGrid {
        width,
        height,
        cells,
    }
}

/// Pixels whose centre falls within `[lo, hi]`, clipped to `0..limit`.
fn centre_span(lo: f64, hi: f64, limit: usize) -> Range<usize> {
    let start = (lo - 0.5).ceil().max(0.0);
    let end = ((hi - 0.5).floor() + 1.0).clamp(0.0, limit as f64);
    start as usize..end as usize
}

/// Topmost feature containing a lon/lat point, matching the raster's
/// overwrite order.
pub fn feature_at(features: &[BoundaryFeature], point: &Point<f64>) -> Option<usize> {
    features.iter().rposition(|f| f.shape.contains(point))
}

// ---------------------------------------------------------------------------
// Choropleth values and colours
// ---------------------------------------------------------------------------

/// Tonnage per feature, joined on the administrative code.
pub fn feature_values(features: &[BoundaryFeature], units: &[UnitTotal]) -> Vec<Option<f64>> {
    let by_code: HashMap<&str, f64> = units
        .iter()
        .map(|u| (u.code.as_str(), u.tonnage))
        .collect();
    features
        .iter()
        .map(|f| by_code.get(f.code.as_str()).copied())
        .collect()
}

/// Linear colour scale between the smallest and largest finite value.
pub fn feature_colors(values: &[Option<f64>]) -> Vec<Color32> {
    let finite = values.iter().flatten().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    values
        .iter()
        .map(|value| match value {
            Some(v) if v.is_finite() => {
                let t = if hi > lo { (v - lo) / (hi - lo) } else { 1.0 };
                ylorrd(t as f32)
            }
            _ => NO_DATA,
        })
        .collect()
}

pub fn paint(grid: &CoverageGrid, colors: &[Color32]) -> ColorImage {
    let mut image = ColorImage::new([grid.width, grid.height], Color32::TRANSPARENT);
    for (pixel, cell) in image.pixels.iter_mut().zip(&grid.cells) {
        if let Some(index) = cell {
            *pixel = colors[*index as usize];
        }
    }
    image
}

// ---------------------------------------------------------------------------
// Map canvas (Map tab)
// ---------------------------------------------------------------------------

/// Zoom/pan state plus the cached raster for the current dashboard.
pub struct MapCanvas {
    pub zoom: f32,
    pub offset: Vec2,
    grid: Option<(Projection, CoverageGrid)>,
    texture: Option<TextureHandle>,
    values: Vec<Option<f64>>,
    painted_generation: u64,
}

impl Default for MapCanvas {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
            grid: None,
            texture: None,
            values: Vec::new(),
            painted_generation: 0,
        }
    }
}

impl MapCanvas {
    pub fn show(&mut self, ui: &mut Ui, state: &AppState) {
        let Some(loaded) = &state.loaded else {
            return;
        };
        let features = &loaded.boundaries.features;

        if self.grid.is_none() {
            let Some(projection) = loaded
                .boundaries
                .bounds()
                .and_then(|b| Projection::fit(b, RASTER_SIDE))
            else {
                ui.label("The boundary file has no polygons to draw.");
                return;
            };
            self.grid = Some((projection, rasterize(features, &projection)));
        }
        let Some((projection, grid)) = &self.grid else {
            return;
        };

        if self.painted_generation != state.generation || self.texture.is_none() {
            self.values = feature_values(features, &state.dashboard.units);
            let image = paint(grid, &feature_colors(&self.values));
            self.texture = Some(ui.ctx().load_texture(
                "choropleth",
                image,
                egui::TextureOptions::NEAREST,
            ));
            self.painted_generation = state.generation;
        }
        let Some(texture) = &self.texture else {
            return;
        };

        // Fit the raster into the panel, leaving a line for the hover readout.
        let available = ui.available_size();
        let canvas = Vec2::new(available.x, (available.y - 24.0).max(100.0));
        let (response, painter) = ui.allocate_painter(canvas, Sense::click_and_drag());
        let aspect = grid.width as f32 / grid.height as f32;
        let base_scale = if canvas.x / canvas.y > aspect {
            canvas.y / grid.height as f32
        } else {
            canvas.x / grid.width as f32
        };
        let size = Vec2::new(grid.width as f32, grid.height as f32) * base_scale * self.zoom;
        let img_rect = Rect::from_center_size(response.rect.center() + self.offset, size);

        painter.rect_filled(response.rect, 0.0, Color32::WHITE);
        painter.image(
            texture.id(),
            img_rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let factor = if scroll > 0.0 { 1.1 } else { 1.0 / 1.1 };
                self.zoom = (self.zoom * factor).clamp(0.5, 40.0);
            }
        }
        if response.dragged() {
            self.offset += response.drag_delta();
        }
        if response.double_clicked() {
            self.zoom = 1.0;
            self.offset = Vec2::ZERO;
        }

        let readout = response
            .hover_pos()
            .filter(|pos| img_rect.contains(*pos))
            .and_then(|pos| {
                let rel = (pos - img_rect.min) / img_rect.size();
                let point = projection.to_world(
                    f64::from(rel.x) * grid.width as f64,
                    f64::from(rel.y) * grid.height as f64,
                );
                feature_at(features, &point)
            })
            .map(|index| {
                let feature = &features[index];
                let name = if feature.name.is_empty() {
                    &feature.code
                } else {
                    &feature.name
                };
                match self.values.get(index).copied().flatten() {
                    Some(t) => format!("{name}: {t:.2} t"),
                    None => format!("{name}: no data"),
                }
            });
        ui.label(readout.unwrap_or_else(|| {
            "Scroll to zoom, drag to pan, double-click to reset.".to_string()
        }));
    }
}

#[cfg(test)]
mod tests {
    use geo::{LineString, MultiPolygon, Polygon};

    use super::*;

    fn square(min: f64, max: f64) -> LineString<f64> {
        LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)])
    }

    fn feature(code: &str, polygons: Vec<Polygon<f64>>) -> BoundaryFeature {
        BoundaryFeature {
            code: code.to_string(),
            name: format!("Commune {code}"),
            shape: MultiPolygon::new(polygons),
        }
    }

    fn bounds(min: f64, max: f64) -> geo::Rect<f64> {
        geo::Rect::new(Coord { x: min, y: min }, Coord { x: max, y: max })
    }

    fn owner(grid: &CoverageGrid, x: usize, y: usize) -> Option<u32> {
        grid.cells[y * grid.width + x]
    }

    #[test]
    fn projection_keeps_aspect_and_flips_y() {
        let projection = Projection::fit(bounds(0.0, 4.0), 4).unwrap();
        assert_eq!((projection.width, projection.height), (4, 4));
        let [_, top] = projection.to_pixel(Coord { x: 0.0, y: 4.0 });
        let [_, bottom] = projection.to_pixel(Coord { x: 0.0, y: 0.0 });
        assert_eq!(top, 0.0);
        assert_eq!(bottom, 4.0);

        let corner = projection.to_world(0.0, 4.0);
        assert!(corner.x().abs() < 1e-9);
        assert!(corner.y().abs() < 1e-9);
    }

    #[test]
    fn degenerate_bounds_cannot_be_projected() {
        assert!(Projection::fit(bounds(1.0, 1.0), 100).is_none());
    }

    #[test]
    fn holes_are_left_empty() {
        let donut = feature("1", vec![Polygon::new(square(0.0, 4.0), vec![square(1.0, 3.0)])]);
        let projection = Projection::fit(bounds(0.0, 4.0), 4).unwrap();
        let grid = rasterize(&[donut], &projection);

        assert_eq!(owner(&grid, 0, 0), Some(0));
        assert_eq!(owner(&grid, 3, 3), Some(0));
        assert_eq!(owner(&grid, 1, 1), None);
        assert_eq!(owner(&grid, 2, 2), None);
    }

    #[test]
    fn concave_outline_fills_only_its_inside() {
        // An L shape: the top-right quadrant is outside.
        let l_shape = LineString::from(vec![
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 2.0),
            (2.0, 2.0),
            (2.0, 4.0),
            (0.0, 4.0),
        ]);
        let projection = Projection::fit(bounds(0.0, 4.0), 4).unwrap();
        let grid = rasterize(&[feature("1", vec![Polygon::new(l_shape, vec![])])], &projection);

        assert_eq!(owner(&grid, 0, 0), Some(0));
        assert_eq!(owner(&grid, 3, 0), None);
        assert_eq!(owner(&grid, 3, 3), Some(0));
    }

    #[test]
    fn polygons_outside_the_raster_are_clipped() {
        let projection = Projection::fit(bounds(0.0, 4.0), 4).unwrap();
        let far = feature("9", vec![Polygon::new(square(10.0, 12.0), vec![])]);
        let grid = rasterize(&[far], &projection);
        assert!(grid.cells.iter().all(Option::is_none));
    }

    #[test]
    fn hover_hits_the_topmost_containing_feature() {
        let features = vec![
            feature("1", vec![Polygon::new(square(0.0, 4.0), vec![square(1.0, 3.0)])]),
            feature("2", vec![Polygon::new(square(3.0, 5.0), vec![])]),
        ];
        assert_eq!(feature_at(&features, &Point::new(0.5, 0.5)), Some(0));
        assert_eq!(feature_at(&features, &Point::new(2.0, 2.0)), None);
        assert_eq!(feature_at(&features, &Point::new(3.5, 3.5)), Some(1));
        assert_eq!(feature_at(&features, &Point::new(9.0, 9.0)), None);
    }

    #[test]
    fn unmatched_features_get_the_no_data_fill() {
        let features = vec![feature("1", vec![]), feature("2", vec![]), feature("3", vec![])];
        let units = vec![
            UnitTotal {
                commune_id: 1,
                code: "1".into(),
                name: Some("Commune 1".into()),
                tonnage: 2.0,
            },
            UnitTotal {
                commune_id: 3,
                code: "3".into(),
                name: Some("Commune 3".into()),
                tonnage: 10.0,
            },
            UnitTotal {
                commune_id: 7,
                code: "7".into(),
                name: None,
                tonnage: 99.0,
            },
        ];

        let values = feature_values(&features, &units);
        assert_eq!(values, vec![Some(2.0), None, Some(10.0)]);

        let colors = feature_colors(&values);
        assert_eq!(colors[0], ylorrd(0.0));
        assert_eq!(colors[1], NO_DATA);
        assert_eq!(colors[2], ylorrd(1.0));
    }

    #[test]
    fn paint_uses_feature_colors() {
        let projection = Projection::fit(bounds(0.0, 4.0), 4).unwrap();
        let square_feature = feature("1", vec![Polygon::new(square(0.0, 2.0), vec![])]);
        let grid = rasterize(&[square_feature], &projection);
        let image = paint(&grid, &[Color32::RED]);

        assert_eq!(image.size, [4, 4]);
        // Bottom-left quadrant in map space is the bottom-left of the image.
        assert_eq!(image.pixels[3 * 4], Color32::RED);
        assert_eq!(image.pixels[3], Color32::TRANSPARENT);
    }
}
