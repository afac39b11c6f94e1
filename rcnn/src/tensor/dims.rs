use std::fmt::{Display, Formatter, Write};

/// Runtime tensor dimensions. The layer pipeline carries mixed ranks
/// through a single channel (4-D feature maps into 2-D score matrices), so
/// rank is data here rather than a type parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dims {
    D1(usize),
    D2(usize, usize),
    D3(usize, usize, usize),
    D4(usize, usize, usize, usize),
}

impl Dims {
    pub fn ndim(&self) -> usize {
        match self {
            Dims::D1(..) => 1,
            Dims::D2(..) => 2,
            Dims::D3(..) => 3,
            Dims::D4(..) => 4,
        }
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        match *self {
            Dims::D1(a) => a,
            Dims::D2(a, b) => a * b,
            Dims::D3(a, b, c) => a * b * c,
            Dims::D4(a, b, c, d) => a * b * c * d,
        }
    }

    /// Extent of the first (batch) axis.
    pub fn first(&self) -> usize {
        match *self {
            Dims::D1(a) | Dims::D2(a, ..) | Dims::D3(a, ..) | Dims::D4(a, ..) => a,
        }
    }

    /// Element count of one first-axis entry.
    pub fn chunk_size(&self) -> usize {
        match *self {
            Dims::D1(..) => 1,
            Dims::D2(_, b) => b,
            Dims::D3(_, b, c) => b * c,
            Dims::D4(_, b, c, d) => b * c * d,
        }
    }

    pub fn with_first(&self, size: usize) -> Dims {
        match *self {
            Dims::D1(..) => Dims::D1(size),
            Dims::D2(_, b) => Dims::D2(size, b),
            Dims::D3(_, b, c) => Dims::D3(size, b, c),
            Dims::D4(_, b, c, d) => Dims::D4(size, b, c, d),
        }
    }

    #[track_caller]
    pub fn unwrap_2d(&self) -> (usize, usize) {
        match *self {
            Dims::D2(rows, cols) => (rows, cols),
            other => panic!("expected a 2-D tensor, got {other}"),
        }
    }

    #[track_caller]
    pub fn unwrap_4d(&self) -> (usize, usize, usize, usize) {
        match *self {
            Dims::D4(n, c, h, w) => (n, c, h, w),
            other => panic!("expected a 4-D tensor, got {other}"),
        }
    }

    pub fn as_vec(&self) -> Vec<usize> {
        match *self {
            Dims::D1(a) => vec![a],
            Dims::D2(a, b) => vec![a, b],
            Dims::D3(a, b, c) => vec![a, b, c],
            Dims::D4(a, b, c, d) => vec![a, b, c, d],
        }
    }
}

impl Display for Dims {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_char('(')?;
        for (i, extent) in self.as_vec().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(extent, f)?;
        }
        f.write_char(')')
    }
}

#[cfg(test)]
mod test {
    use super::Dims;

    #[test]
    fn test_sizes() {
        assert_eq!(Dims::D1(7).size(), 7);
        assert_eq!(Dims::D2(3, 4).size(), 12);
        assert_eq!(Dims::D4(2, 3, 4, 5).size(), 120);
        assert_eq!(Dims::D4(2, 3, 4, 5).chunk_size(), 60);
        assert_eq!(Dims::D3(2, 3, 4).first(), 2);
    }

    #[test]
    fn test_with_first() {
        assert_eq!(Dims::D4(9, 1, 28, 28).with_first(2), Dims::D4(2, 1, 28, 28));
        assert_eq!(Dims::D1(3).with_first(5), Dims::D1(5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Dims::D2(2, 10).to_string(), "(2, 10)");
        assert_eq!(Dims::D4(1, 30, 24, 24).to_string(), "(1, 30, 24, 24)");
    }
}
