use super::BoundingPolygon;

/// Height must exceed `width * VERTICAL_ASPECT` for a line to count as vertical.
pub const VERTICAL_ASPECT: f32 = 1.0;

pub fn is_degenerate(polygon: &BoundingPolygon) -> bool {
    let [x0, y0, x1, _, _, y2, _, _] = polygon.0;
    x1 - x0 <= 0 || y2 - y0 <= 0
}

pub fn height(polygon: &BoundingPolygon) -> i32 {
    if is_degenerate(polygon) {
        return 0;
    }
    let [_, y0, _, _, _, y2, _, _] = polygon.0;
    y2 - y0
}

pub fn width(polygon: &BoundingPolygon) -> i32 {
    if is_degenerate(polygon) {
        return 0;
    }
    let [x0, _, x1, _, _, _, _, _] = polygon.0;
    x1 - x0
}

pub fn is_vertical(polygon: &BoundingPolygon) -> bool {
    if is_degenerate(polygon) {
        return false;
    }
    height(polygon) as f32 > width(polygon) as f32 * VERTICAL_ASPECT
}

/// Scalar used for size classification. Only meaningful for horizontal lines.
pub fn text_size(polygon: &BoundingPolygon) -> f32 {
    height(polygon) as f32
}
