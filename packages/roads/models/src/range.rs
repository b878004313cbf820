//! Address-number ranges and the `[low, high]` envelope derived from them.

use serde::{Deserialize, Serialize};

/// The four address-range fields of a road segment.
///
/// A value of `0` means "not applicable" for that end of that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    /// First address number on the left side.
    pub from_left: i64,
    /// Last address number on the left side.
    pub to_left: i64,
    /// First address number on the right side.
    pub from_right: i64,
    /// Last address number on the right side.
    pub to_right: i64,
}

/// The `[low, high]` address-number bound of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Envelope {
    /// Lowest address number.
    pub low: i64,
    /// Highest address number.
    pub high: i64,
}

impl AddressRange {
    /// Creates a range from left and right `(from, to)` pairs.
    #[must_use]
    pub const fn new(from_left: i64, to_left: i64, from_right: i64, to_right: i64) -> Self {
        Self {
            from_left,
            to_left,
            from_right,
            to_right,
        }
    }

    /// Computes the `[low, high]` envelope of this range.
    ///
    /// A zero `from` value is treated as missing and the other side's
    /// value is used instead. When both `from` values are zero the low
    /// bound is `0`. The high bound is the plain maximum of the two `to`
    /// values.
    #[must_use]
    pub const fn envelope(&self) -> Envelope {
        let low = if self.from_left == 0 || self.from_right == 0 {
            if self.from_left == 0 {
                self.from_right
            } else {
                self.from_left
            }
        } else if self.from_left < self.from_right {
            self.from_left
        } else {
            self.from_right
        };

        let high = if self.to_left > self.to_right {
            self.to_left
        } else {
            self.to_right
        };

        Envelope { low, high }
    }

    /// Returns `true` if either endpoint of `envelope` lies inside the
    /// left or the right side of this range.
    ///
    /// Bounds are inclusive and a side whose `from` exceeds its `to`
    /// contains nothing, matching SQL `BETWEEN`.
    #[must_use]
    pub const fn contains_either(&self, envelope: Envelope) -> bool {
        between(envelope.low, self.from_left, self.to_left)
            || between(envelope.high, self.from_left, self.to_left)
            || between(envelope.low, self.from_right, self.to_right)
            || between(envelope.high, self.from_right, self.to_right)
    }

    /// Returns `true` if at least one side carries a non-zero range
    /// (both its `from` and `to` are non-zero).
    #[must_use]
    pub const fn has_addressable_side(&self) -> bool {
        (self.from_left != 0 && self.to_left != 0) || (self.from_right != 0 && self.to_right != 0)
    }
}

const fn between(value: i64, from: i64, to: i64) -> bool {
    from <= value && value <= to
}
