use super::FrameError;

/// Row-major 2D buffer with bounds-checked signed pixel access.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T> Grid<T> {
    /// Wrap a row-major buffer. Fails if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, FrameError> {
        if data.len() != width * height {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build by evaluating `f(u, v)` for every pixel in row-major order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for v in 0..height {
            for u in 0..width {
                data.push(f(u, v));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn contains(&self, u: i32, v: i32) -> bool {
        u >= 0 && v >= 0 && (u as usize) < self.width && (v as usize) < self.height
    }

    /// Sample at column `u`, row `v`. `None` outside the image.
    #[inline]
    pub fn get(&self, u: i32, v: i32) -> Option<&T> {
        if !self.contains(u, v) {
            return None;
        }
        self.data.get(v as usize * self.width + u as usize)
    }

    pub fn get_mut(&mut self, u: i32, v: i32) -> Option<&mut T> {
        if !self.contains(u, v) {
            return None;
        }
        self.data.get_mut(v as usize * self.width + u as usize)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Iterate `(u, v, value)` in row-major order.
    pub fn indexed_iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, value)| (i % width, i / width, value))
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }
}
