/// ASCII rasterizer for painting scene frames in the terminal
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use isoflow_core::{DrawItem, DrawKind, Frame, Point2D};
use std::io::Write;

/// Terminal cells are roughly twice as tall as they are wide; screen y is
/// halved when mapping to rows.
pub const CELL_ASPECT: f64 = 0.5;

/// Character ramp for particle heads and trails (faintest to brightest)
const PARTICLE_RAMP: &[char] = &['.', ':', '+', '*', 'o', '@'];

/// Face shades cycled per box so neighbours stay distinguishable
const BOX_FILLS: &[char] = &['░', '▒', '▓'];

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    color: Color,
}

const BLANK: Cell = Cell {
    ch: ' ',
    color: Color::Reset,
};

/// Paints frames back to front into a character buffer
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![BLANK; width * height],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = vec![BLANK; width * height];
    }

    pub fn clear(&mut self) {
        self.cells.fill(BLANK);
    }

    /// Screen point to (column, row).
    pub fn to_cell(point: &Point2D) -> (i32, i32) {
        (point.x.round() as i32, (point.y * CELL_ASPECT).round() as i32)
    }

    /// Items arrive sorted by rank, so later items overwrite earlier ones.
    pub fn render_frame(&mut self, frame: &Frame) {
        let mut box_count = 0;
        for item in &frame.items {
            self.render_item(item, &mut box_count);
        }
    }

    fn render_item(&mut self, item: &DrawItem, box_count: &mut usize) {
        match &item.kind {
            DrawKind::Box { corners, .. } => {
                let cells: Vec<(i32, i32)> = corners.iter().map(Self::to_cell).collect();
                let fill = BOX_FILLS[*box_count % BOX_FILLS.len()];
                *box_count += 1;
                self.fill_convex(&convex_hull(&cells), Cell {
                    ch: fill,
                    color: Color::DarkCyan,
                });
                for (a, b) in isoflow_core::IsoBox::EDGES.iter().copied() {
                    // Top ring and verticals only; the base is hidden by the fill.
                    if a < 4 && b < 4 {
                        continue;
                    }
                    self.draw_line(cells[a], cells[b], Color::Cyan);
                }
            }
            DrawKind::Segment { start, end, .. } => {
                self.draw_line(Self::to_cell(start), Self::to_cell(end), Color::Yellow);
            }
            DrawKind::Particle {
                position, opacity, ..
            } => {
                let ramp_max = (PARTICLE_RAMP.len() - 1) as f64;
                let idx = (opacity.clamp(0.0, 1.0) * ramp_max).round() as usize;
                let (x, y) = Self::to_cell(position);
                let cell = Cell {
                    ch: PARTICLE_RAMP[idx],
                    color: Color::Magenta,
                };
                self.put(x, y, cell);
            }
        }
    }

    fn put(&mut self, x: i32, y: i32, cell: Cell) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.cells[y as usize * self.width + x as usize] = cell;
    }

    fn draw_line(&mut self, a: (i32, i32), b: (i32, i32), color: Color) {
        let ch = line_glyph(a, b);
        for (x, y) in line_cells(a, b) {
            self.put(x, y, Cell { ch, color });
        }
    }

    fn fill_convex(&mut self, hull: &[(i32, i32)], cell: Cell) {
        if hull.len() < 3 {
            return;
        }
        // Bounding box, clipped to the screen
        let min_x = hull.iter().map(|p| p.0).min().unwrap_or(0).max(0);
        let max_x = hull.iter().map(|p| p.0).max().unwrap_or(0).min(self.width as i32 - 1);
        let min_y = hull.iter().map(|p| p.1).min().unwrap_or(0).max(0);
        let max_y = hull.iter().map(|p| p.1).max().unwrap_or(0).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if inside_convex(hull, (x, y)) {
                    self.put(x, y, cell);
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = Color::Reset;
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                if cell.color != current {
                    writer.queue(SetForegroundColor(cell.color))?;
                    current = cell.color;
                }
                writer.queue(Print(cell.ch))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }

    /// The buffer as plain text, one line per row.
    pub fn text(&self) -> String {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| c.ch).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Cells on the line from `a` to `b`, both ends included (Bresenham).
pub fn line_cells(a: (i32, i32), b: (i32, i32)) -> Vec<(i32, i32)> {
    let (mut x, mut y) = a;
    let dx = (b.0 - a.0).abs();
    let dy = -(b.1 - a.1).abs();
    let sx = if a.0 < b.0 { 1 } else { -1 };
    let sy = if a.1 < b.1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut cells = Vec::with_capacity((dx - dy + 1) as usize);
    loop {
        cells.push((x, y));
        if (x, y) == b {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// Glyph approximating the slope of a line in cell space.
pub fn line_glyph(a: (i32, i32), b: (i32, i32)) -> char {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    if dy == 0 || dx.abs() > 2 * dy.abs() {
        '-'
    } else if dx == 0 || dy.abs() > 2 * dx.abs() {
        '|'
    } else if (dx > 0) == (dy > 0) {
        '\\'
    } else {
        '/'
    }
}

fn cross(o: (i32, i32), a: (i32, i32), b: (i32, i32)) -> i64 {
    (a.0 - o.0) as i64 * (b.1 - o.1) as i64 - (a.1 - o.1) as i64 * (b.0 - o.0) as i64
}

/// Convex hull, counter-clockwise in cell space (monotone chain).
pub fn convex_hull(points: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut pts = points.to_vec();
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let mut hull: Vec<(i32, i32)> = Vec::with_capacity(pts.len() * 2);
    for pass in 0..2 {
        let start = hull.len();
        let iter: Box<dyn Iterator<Item = &(i32, i32)>> = if pass == 0 {
            Box::new(pts.iter())
        } else {
            Box::new(pts.iter().rev())
        };
        for &p in iter {
            while hull.len() >= start + 2
                && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0
            {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();
    }
    hull
}

fn inside_convex(hull: &[(i32, i32)], p: (i32, i32)) -> bool {
    (0..hull.len()).all(|i| cross(hull[i], hull[(i + 1) % hull.len()], p) >= 0)
}
