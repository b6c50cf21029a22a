//! Axis-aligned bounding boxes and the geometry shared by every fusion stage.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `(x0, y0)`–`(x1, y1)`, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Area, zero for inverted or flat boxes.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Overlapping region, if the boxes overlap with a positive area.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        let inter = BBox {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        if inter.area() > 0.0 {
            Some(inter)
        } else {
            None
        }
    }

    /// Fraction of `self` covered by `other`.
    ///
    /// Asymmetric: `a.intersection_pct(&b)` divides by the area of `a`.
    /// Degenerate boxes yield `0.0`.
    ///
    /// # Example
    ///
    /// ```
    /// use docfuse::BBox;
    ///
    /// let line = BBox::new(0.0, 0.0, 10.0, 10.0);
    /// let region = BBox::new(0.0, 0.0, 5.0, 10.0);
    /// assert_eq!(line.intersection_pct(&region), 0.5);
    /// assert_eq!(region.intersection_pct(&line), 1.0);
    /// ```
    pub fn intersection_pct(&self, other: &BBox) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        match self.intersection(other) {
            Some(inter) => inter.area() / area,
            None => 0.0,
        }
    }

    /// Map this box from the `from` coordinate space into the `to` space.
    ///
    /// Linear per axis: `to.origin + (self - from.origin) * (to.size / from.size)`.
    /// A flat `from` axis keeps the scale factor at 1.
    pub fn rescale(&self, from: &BBox, to: &BBox) -> BBox {
        let sx = scale_factor(to.width(), from.width());
        let sy = scale_factor(to.height(), from.height());
        BBox {
            x0: to.x0 + (self.x0 - from.x0) * sx,
            y0: to.y0 + (self.y0 - from.y0) * sy,
            x1: to.x0 + (self.x1 - from.x0) * sx,
            y1: to.y0 + (self.y1 - from.y0) * sy,
        }
    }

    /// Gap between the boxes along the y axis, zero when they overlap vertically.
    pub fn vertical_gap(&self, other: &BBox) -> f32 {
        (other.y0 - self.y1).max(self.y0 - other.y1).max(0.0)
    }

    /// Gap between the boxes along the x axis, zero when they overlap horizontally.
    pub fn horizontal_gap(&self, other: &BBox) -> f32 {
        (other.x0 - self.x1).max(self.x0 - other.x1).max(0.0)
    }
}

fn scale_factor(target: f32, source: f32) -> f32 {
    if source.abs() <= f32::EPSILON {
        1.0
    } else {
        target / source
    }
}

/// Map a model image-space box into page space.
pub fn rescale(image_bbox: &BBox, page_bbox: &BBox, bbox: &BBox) -> BBox {
    bbox.rescale(image_bbox, page_bbox)
}

/// Anything that occupies a rectangle on the page.
pub trait HasBBox {
    fn bbox(&self) -> BBox;
}

impl HasBBox for BBox {
    fn bbox(&self) -> BBox {
        *self
    }
}

/// Smallest box containing every item, `None` for an empty input.
pub fn union_bbox<'a, T, I>(items: I) -> Option<BBox>
where
    T: HasBBox + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .map(HasBBox::bbox)
        .reduce(|acc, b| acc.union(&b))
}
