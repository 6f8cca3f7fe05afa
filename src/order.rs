use serde::{Deserialize, Serialize};

/// Axis strider: which dimension varies fastest when flattening a position
/// to a linear index, or a chunk grid to a chunk id.
///
/// `ColumnMajor`: axis 0 is fastest-varying. `RowMajor`: axis `N-1` is
/// fastest-varying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    ColumnMajor,
    RowMajor,
}

impl Default for Order {
    fn default() -> Self {
        Order::ColumnMajor
    }
}

impl Order {
    /// `.zarray`'s `"order"` field maps `"C"` to column-major and `"F"` to
    /// row-major in this store. This is the inverse of the conventional
    /// Zarr/NumPy labeling (where `"C"` is row-major and `"F"` is
    /// column-major).
    ///
    /// This implementation preserves the mapping as specified rather than
    /// "fixing" it to match upstream Zarr, since there is no fixture here
    /// from an external Zarr writer to confirm which reading is intentional.
    /// See DESIGN.md's Open Questions.
    pub fn from_zarr_letter(letter: &str) -> Option<Self> {
        match letter {
            "C" => Some(Order::ColumnMajor),
            "F" => Some(Order::RowMajor),
            _ => None,
        }
    }

    pub fn to_zarr_letter(self) -> &'static str {
        match self {
            Order::ColumnMajor => "C",
            Order::RowMajor => "F",
        }
    }

    /// Axis traversal order used by [crate::indexing::find_position]: the
    /// sequence in which axes are peeled off the linear index, fastest
    /// dimension first.
    pub(crate) fn axis_order(self, ndim: usize) -> Box<dyn Iterator<Item = usize>> {
        match self {
            Order::ColumnMajor => Box::new(0..ndim),
            Order::RowMajor => Box::new((0..ndim).rev()),
        }
    }
}
