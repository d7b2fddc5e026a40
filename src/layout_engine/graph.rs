use serde::{Deserialize, Serialize};

use crate::model::geometry::Rect;

/// Axis along which a split node divides its space.
///
/// `Row` places the two children side by side (the ratio applies to the
/// width), `Column` stacks them (the ratio applies to the height).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::EnumString,
    strum_macros::Display
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitDirection {
    Row,
    Column,
}

impl SplitDirection {
    /// Length of `area` along this axis.
    pub fn extent(self, area: Rect) -> f64 {
        match self {
            SplitDirection::Row => area.w,
            SplitDirection::Column => area.h,
        }
    }

    /// Divide `area` into the two child rects at `ratio`.
    pub fn divide(self, area: Rect, ratio: f64) -> (Rect, Rect) {
        match self {
            SplitDirection::Row => {
                let first = area.w * ratio;
                (
                    Rect::new(area.x, area.y, first, area.h),
                    Rect::new(area.x + first, area.y, area.w - first, area.h),
                )
            }
            SplitDirection::Column => {
                let first = area.h * ratio;
                (
                    Rect::new(area.x, area.y, area.w, first),
                    Rect::new(area.x, area.y + first, area.w, area.h - first),
                )
            }
        }
    }
}
