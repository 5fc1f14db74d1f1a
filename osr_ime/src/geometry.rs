// SPDX-License-Identifier: GPL-3.0-or-later

/// Half-open range of UTF-16 offsets, `[from, to)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub from: u32,
    pub to: u32,
}

impl Range {
    pub const fn new(from: u32, to: u32) -> Range {
        Range { from, to }
    }

    pub const fn len(&self) -> u32 {
        self.to.saturating_sub(self.from)
    }

    pub const fn is_empty(&self) -> bool {
        self.to <= self.from
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

/// Rectangle in window client coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub const fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn bottom_left(&self) -> Point {
        Point::new(self.x, self.bottom())
    }

    pub const fn offset_y(self, dy: i32) -> Rect {
        Rect {
            y: self.y + dy,
            ..self
        }
    }
}
