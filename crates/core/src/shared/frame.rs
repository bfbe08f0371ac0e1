use ndarray::{ArrayView2, ArrayViewMut2};

/// Index of the luma plane in [`VideoFrame::plane`].
pub const LUMA: usize = 0;
pub const CB: usize = 1;
pub const CR: usize = 2;

/// A single decoded picture in planar YUV 4:2:0, tightly packed.
///
/// The luma plane is `width * height` bytes; each chroma plane is
/// `ceil(width / 2) * ceil(height / 2)` bytes. Stride padding from the codec
/// library is stripped at the I/O boundary so the domain layer never sees it.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    planes: [Vec<u8>; 3],
    width: u32,
    height: u32,
    pts: i64,
}

impl VideoFrame {
    pub fn new(planes: [Vec<u8>; 3], width: u32, height: u32, pts: i64) -> Self {
        debug_assert_eq!(
            planes[LUMA].len(),
            plane_len(LUMA, width, height),
            "luma plane length must equal width * height"
        );
        debug_assert!(
            planes[CB].len() == plane_len(CB, width, height)
                && planes[CR].len() == plane_len(CR, width, height),
            "chroma plane length must equal ceil(width / 2) * ceil(height / 2)"
        );
        Self {
            planes,
            width,
            height,
            pts,
        }
    }

    /// A black frame (Y = 0, neutral chroma).
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(
            [
                vec![0; plane_len(LUMA, width, height)],
                vec![128; plane_len(CB, width, height)],
                vec![128; plane_len(CR, width, height)],
            ],
            width,
            height,
            0,
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pts(&self) -> i64 {
        self.pts
    }

    pub fn set_pts(&mut self, pts: i64) {
        self.pts = pts;
    }

    pub fn plane(&self, index: usize) -> &[u8] {
        &self.planes[index]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.planes[index]
    }

    /// Width in bytes of one row of the given plane.
    pub fn plane_width(&self, index: usize) -> usize {
        plane_dims(index, self.width, self.height).1
    }

    pub fn plane_height(&self, index: usize) -> usize {
        plane_dims(index, self.width, self.height).0
    }

    /// The luma plane as a `(height, width)` array.
    pub fn luma(&self) -> ArrayView2<'_, u8> {
        self.plane_view(LUMA)
    }

    pub fn luma_mut(&mut self) -> ArrayViewMut2<'_, u8> {
        self.plane_view_mut(LUMA)
    }

    pub fn plane_view(&self, index: usize) -> ArrayView2<'_, u8> {
        let shape = plane_dims(index, self.width, self.height);
        ArrayView2::from_shape(shape, &self.planes[index])
            .expect("Plane length must match frame dimensions")
    }

    pub fn plane_view_mut(&mut self, index: usize) -> ArrayViewMut2<'_, u8> {
        let shape = plane_dims(index, self.width, self.height);
        ArrayViewMut2::from_shape(shape, &mut self.planes[index])
            .expect("Plane length must match frame dimensions")
    }
}

/// `(rows, columns)` of a YUV 4:2:0 plane.
fn plane_dims(index: usize, width: u32, height: u32) -> (usize, usize) {
    if index == LUMA {
        (height as usize, width as usize)
    } else {
        (height.div_ceil(2) as usize, width.div_ceil(2) as usize)
    }
}

fn plane_len(index: usize, width: u32, height: u32) -> usize {
    let (rows, cols) = plane_dims(index, width, height);
    rows * cols
}
