use crate::primitives::bytes::ByteCount;

/// Upper size bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMax {
    Bytes(ByteCount),
    Unlimited,
}

/// Size of a volume.
///
/// When `default` is set the solver decides and `min`/`max` only carry the
/// product defaults. A `None` bound stands for the current size of the
/// matched device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub default: bool,
    pub min: Option<ByteCount>,
    pub max: Option<SizeMax>,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            default: true,
            min: None,
            max: None,
        }
    }
}

impl Size {
    /// Fixed size, min and max are equal.
    pub fn exact(size: ByteCount) -> Self {
        Self {
            default: false,
            min: Some(size),
            max: Some(SizeMax::Bytes(size)),
        }
    }

    pub fn range(min: ByteCount, max: SizeMax) -> Self {
        Self {
            default: false,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Shrink as much as needed, never grow beyond the current size.
    pub fn shrink_if_needed() -> Self {
        Self {
            default: false,
            min: Some(ByteCount(0)),
            max: None,
        }
    }

    /// Solver-decided size carrying product defaults.
    pub fn product_default(min: Option<ByteCount>, max: Option<SizeMax>) -> Self {
        Self {
            default: true,
            min,
            max,
        }
    }

    pub fn is_shrink_if_needed(&self) -> bool {
        !self.default && self.min == Some(ByteCount(0))
    }

    /// Min and max are the same, known value.
    pub fn is_exact(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(SizeMax::Bytes(max))) => min == max,
            (None, None) => true,
            _ => false,
        }
    }

    /// Replaces "current" bounds with the given device size.
    pub fn with_current(self, current: ByteCount) -> Self {
        Self {
            min: Some(self.min.unwrap_or(current)),
            max: Some(self.max.unwrap_or(SizeMax::Bytes(current))),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        assert!(Size::default().default);
        assert!(!Size::default().is_shrink_if_needed());
        assert!(Size::shrink_if_needed().is_shrink_if_needed());

        assert!(Size::exact(ByteCount::gib(1)).is_exact());
        assert!(!Size::range(ByteCount::gib(1), SizeMax::Unlimited).is_exact());
        assert!(!Size::range(ByteCount::gib(1), SizeMax::Bytes(ByteCount::gib(2))).is_exact());
        assert!(!Size::shrink_if_needed().is_exact());
    }

    #[test]
    fn test_with_current() {
        let current = ByteCount::gib(8);
        assert_eq!(
            Size::shrink_if_needed().with_current(current),
            Size::range(ByteCount(0), SizeMax::Bytes(current))
        );
        assert_eq!(
            Size::range(ByteCount::gib(1), SizeMax::Unlimited).with_current(current),
            Size::range(ByteCount::gib(1), SizeMax::Unlimited)
        );
    }
}
