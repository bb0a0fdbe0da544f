use crate::mask::BinaryMask;

/// 8-connected foreground region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    /// Pixels as `(x, y)` in scan order of discovery.
    pub pixels: Vec<(usize, usize)>,
}

impl Component {
    pub fn area(&self) -> usize {
        self.pixels.len()
    }

    /// Pixels with at least one 4-neighbour outside the component.
    pub fn boundary(&self, mask: &BinaryMask) -> Vec<(usize, usize)> {
        let (w, h) = mask.dims();
        self.pixels
            .iter()
            .copied()
            .filter(|&(x, y)| {
                x == 0
                    || y == 0
                    || x + 1 == w
                    || y + 1 == h
                    || !mask.get(x - 1, y)
                    || !mask.get(x + 1, y)
                    || !mask.get(x, y - 1)
                    || !mask.get(x, y + 1)
            })
            .collect()
    }
}

/// Label the 8-connected foreground components in row-major order of their
/// first pixel.
pub fn connected_components(mask: &BinaryMask) -> Vec<Component> {
    let (w, h) = mask.dims();
    let mut seen = vec![false; w * h];
    let mut out = Vec::new();
    let mut stack = Vec::new();
    for start in 0..w * h {
        if !mask.data[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let mut pixels = Vec::new();
        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            pixels.push((x, y));
            for dy in -1..=1isize {
                for dx in -1..=1isize {
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                        continue;
                    }
                    let j = ny as usize * w + nx as usize;
                    if mask.data[j] && !seen[j] {
                        seen[j] = true;
                        stack.push(j);
                    }
                }
            }
        }
        out.push(Component { pixels });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_pixels_are_connected() {
        let m = BinaryMask::from_fn(4, 4, |x, y| x == y || (x == 3 && y == 0));
        let comps = connected_components(&m);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].area(), 4);
        assert_eq!(comps[1].pixels, vec![(3, 0)]);
    }

    #[test]
    fn filled_square_boundary_is_its_ring() {
        let m = BinaryMask::from_fn(7, 7, |x, y| (1..6).contains(&x) && (1..6).contains(&y));
        let comps = connected_components(&m);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].area(), 25);
        assert_eq!(comps[0].boundary(&m).len(), 16);
    }
}
