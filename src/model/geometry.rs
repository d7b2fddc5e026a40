use serde::{Deserialize, Serialize};

/// Pixel rectangle handed to and returned from layout calculations.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self { Self { x, y, w, h } }
}

/// Partial geometry update for a floating window. Absent fields are left alone.
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowGeometry {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub w: Option<f64>,
    pub h: Option<f64>,
}

impl WindowGeometry {
    pub fn position(x: f64, y: f64) -> Self { Self { x: Some(x), y: Some(y), ..Self::default() } }

    pub fn size(w: f64, h: f64) -> Self { Self { w: Some(w), h: Some(h), ..Self::default() } }

    pub fn full(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            w: Some(rect.w),
            h: Some(rect.h),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.w.is_none() && self.h.is_none()
    }

    pub(crate) fn is_finite(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().flatten().all(|v| v.is_finite())
    }

    pub fn apply_to(&self, rect: &mut Rect) {
        if let Some(x) = self.x {
            rect.x = x;
        }
        if let Some(y) = self.y {
            rect.y = y;
        }
        if let Some(w) = self.w {
            rect.w = w;
        }
        if let Some(h) = self.h {
            rect.h = h;
        }
    }
}

/// Corner grabbed by a window resize handle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Geometry patch for dragging this corner by `(dx, dy)`, keeping the
    /// opposite corner fixed. Size never drops below `min`.
    pub fn resize(self, rect: Rect, dx: f64, dy: f64, min: (f64, f64)) -> WindowGeometry {
        let (min_w, min_h) = min;
        let (grow_left, grow_up) = match self {
            Corner::TopLeft => (true, true),
            Corner::TopRight => (false, true),
            Corner::BottomLeft => (true, false),
            Corner::BottomRight => (false, false),
        };

        let (x, w) = if grow_left {
            let w = (rect.w - dx).max(min_w);
            (rect.x + rect.w - w, w)
        } else {
            (rect.x, (rect.w + dx).max(min_w))
        };
        let (y, h) = if grow_up {
            let h = (rect.h - dy).max(min_h);
            (rect.y + rect.h - h, h)
        } else {
            (rect.y, (rect.h + dy).max(min_h))
        };

        WindowGeometry::full(Rect::new(x, y, w, h))
    }
}
