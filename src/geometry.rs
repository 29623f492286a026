//! Rectangles and validation of caller-supplied boxes.
//!
//! Boxes arrive from a front-end as loosely typed coordinate lists and are
//! never trusted. [`validate_boxes`] turns them into [`UserBox`] values and
//! counts what it had to drop, so callers can report it.

/// Axis-aligned rectangle in image pixel space with exclusive max edges.
///
/// Covers the pixels `x1..x2` by `y1..y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x1: u32,
    /// Top edge (inclusive).
    pub y1: u32,
    /// Right edge (exclusive).
    pub x2: u32,
    /// Bottom edge (exclusive).
    pub y2: u32,
}

impl Rect {
    /// Build a rectangle from its four edges.
    #[must_use]
    pub const fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Width in pixels (zero when inverted).
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    /// Height in pixels (zero when inverted).
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// True when the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when `other` lies entirely inside `self`.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.x1 <= other.x1 && self.y1 <= other.y1 && self.x2 >= other.x2 && self.y2 >= other.y2
    }

    /// Smallest rectangle covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// A validated caller box, still in unclamped source coordinates.
///
/// All four edges are inclusive pixel positions. Coordinates may be negative
/// or lie past the image edge; clamping happens after dilation so a box just
/// outside the image can still reach into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBox {
    /// Left edge.
    pub x1: i64,
    /// Top edge.
    pub y1: i64,
    /// Right edge.
    pub x2: i64,
    /// Bottom edge.
    pub y2: i64,
}

impl UserBox {
    /// Build a box from integer edges. Returns `None` unless `x1 < x2` and `y1 < y2`.
    #[must_use]
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Option<Self> {
        (x1 < x2 && y1 < y2).then_some(Self { x1, y1, x2, y2 })
    }

    /// Grow the box by `margin` on every side and clamp it to a `width x height` image.
    ///
    /// Box edges are inclusive: `[x1, y1, x2, y2]` covers columns `x1..=x2` and
    /// rows `y1..=y2`, so the returned rectangle ends at `x2 + margin + 1`.
    /// Returns `None` when nothing of the grown box falls inside the image.
    #[must_use]
    pub fn dilate_clamped(&self, margin: u32, width: u32, height: u32) -> Option<Rect> {
        let margin = i64::from(margin);
        let clamp_x = |v: i64| clamp_to(v, width);
        let clamp_y = |v: i64| clamp_to(v, height);
        let rect = Rect::new(
            clamp_x(self.x1.saturating_sub(margin)),
            clamp_y(self.y1.saturating_sub(margin)),
            clamp_x(self.x2.saturating_add(margin).saturating_add(1)),
            clamp_y(self.y2.saturating_add(margin).saturating_add(1)),
        );
        (!rect.is_empty()).then_some(rect)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_to(v: i64, limit: u32) -> u32 {
    v.clamp(0, i64::from(limit)) as u32
}

/// Caller boxes after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxSelection {
    /// Boxes that passed validation, in input order.
    pub boxes: Vec<UserBox>,
    /// Number of entries that were dropped.
    pub dropped: usize,
}

/// Validate raw `[x1, y1, x2, y2]` coordinate lists.
///
/// An entry is dropped when it does not hold exactly four values, when any
/// value is not finite, or when it is degenerate (`x1 >= x2` or `y1 >= y2`).
/// Coordinates are truncated toward zero.
#[must_use]
pub fn validate_boxes<B: AsRef<[f64]>>(raw: &[B]) -> BoxSelection {
    let mut selection = BoxSelection::default();

    for entry in raw {
        match parse_box(entry.as_ref()) {
            Some(b) => selection.boxes.push(b),
            None => selection.dropped += 1,
        }
    }

    selection
}

#[allow(clippy::cast_possible_truncation)]
fn parse_box(coords: &[f64]) -> Option<UserBox> {
    let &[x1, y1, x2, y2] = coords else {
        return None;
    };
    if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
        return None;
    }
    // Saturating float-to-int casts keep absurd coordinates harmless.
    UserBox::new(
        x1.trunc() as i64,
        y1.trunc() as i64,
        x2.trunc() as i64,
        y2.trunc() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_dimensions_and_containment() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = Rect::new(10, 10, 20, 20);
        assert_eq!(outer.width(), 100);
        assert_eq!(outer.height(), 50);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(Rect::new(5, 5, 5, 9).is_empty());
        assert_eq!(inner.union(&Rect::new(15, 0, 30, 12)), Rect::new(10, 0, 30, 20));
    }

    #[test]
    fn validate_drops_wrong_arity() {
        let raw = vec![
            vec![10.0, 20.0, 30.0],
            vec![100.0, 100.0, 150.0, 130.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![],
        ];
        let selection = validate_boxes(&raw);
        assert_eq!(selection.dropped, 3);
        assert_eq!(
            selection.boxes,
            vec![UserBox::new(100, 100, 150, 130).unwrap()]
        );
    }

    #[test]
    fn validate_drops_degenerate_and_non_finite() {
        let raw = [
            [10.0, 10.0, 10.0, 20.0],
            [30.0, 10.0, 20.0, 20.0],
            [0.0, f64::NAN, 5.0, 5.0],
            [0.0, 0.0, f64::INFINITY, 5.0],
        ];
        let selection = validate_boxes(&raw);
        assert!(selection.boxes.is_empty());
        assert_eq!(selection.dropped, 4);
    }

    #[test]
    fn validate_truncates_toward_zero() {
        let selection = validate_boxes(&[[-3.7, 1.9, 10.2, 20.99]]);
        assert_eq!(selection.boxes, vec![UserBox::new(-3, 1, 10, 20).unwrap()]);
    }

    #[test]
    fn dilate_clamps_to_image() {
        let b = UserBox::new(0, 0, 50, 50).unwrap();
        assert_eq!(b.dilate_clamped(6, 400, 300), Some(Rect::new(0, 0, 57, 57)));

        let b = UserBox::new(100, 100, 150, 130).unwrap();
        assert_eq!(
            b.dilate_clamped(6, 400, 300),
            Some(Rect::new(94, 94, 157, 137))
        );

        let b = UserBox::new(380, 280, 420, 320).unwrap();
        assert_eq!(
            b.dilate_clamped(6, 400, 300),
            Some(Rect::new(374, 274, 400, 300))
        );
    }

    #[test]
    fn dilate_reaches_in_from_outside_the_image() {
        let b = UserBox::new(402, 10, 410, 20).unwrap();
        assert_eq!(b.dilate_clamped(6, 400, 300), Some(Rect::new(396, 4, 400, 27)));

        let far = UserBox::new(500, 500, 600, 600).unwrap();
        assert_eq!(far.dilate_clamped(6, 400, 300), None);
    }

    #[test]
    fn dilate_covers_right_and_bottom_edges_inclusively() {
        let b = UserBox::new(10, 20, 30, 40).unwrap();
        let rect = b.dilate_clamped(0, 100, 100).unwrap();
        assert_eq!(rect, Rect::new(10, 20, 31, 41));
        assert_eq!((rect.width(), rect.height()), (21, 21));

        // Ends at column -2: a margin of 2 reaches column 0, a margin of 1 does not.
        let left = UserBox::new(-10, 5, -2, 8).unwrap();
        assert_eq!(left.dilate_clamped(1, 100, 100), None);
        assert_eq!(left.dilate_clamped(2, 100, 100), Some(Rect::new(0, 3, 1, 11)));
    }
}
