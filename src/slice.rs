use crate::{reader::AseReader, user_data::UserData, Result};

/// A slice is a named region of the canvas that can change from frame to
/// frame. Often used for hit boxes, anchor points or nine-patch UI
/// elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    /// Slice name. Not necessarily unique in the file.
    pub name: String,
    /// Keys ordered by frame. Each key is valid from its `from_frame` until the
    /// next key.
    pub keys: Vec<SliceKey>,
    /// The slice's user data. Aseprite stores the slice color here.
    pub user_data: Option<UserData>,
}

/// The state of a [Slice] starting at a specific frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceKey {
    /// First frame this key applies to.
    pub from_frame: u32,
    /// Top left corner of the slice.
    pub origin: (i32, i32),
    /// Width and height of the slice.
    pub size: (u32, u32),
    /// Center rectangle for nine-patch slices: x, y, width, height relative
    /// to the slice origin.
    pub slice9: Option<(i32, i32, u32, u32)>,
    /// Pivot point relative to the slice origin.
    pub pivot: Option<(i32, i32)>,
}

impl Slice {
    /// Slice color, if the slice has user data with a color.
    pub fn color(&self) -> Option<[u8; 4]> {
        self.user_data.as_ref().and_then(|ud| ud.color)
    }
}

pub(crate) fn parse_chunk(data: &[u8], base: u64) -> Result<Slice> {
    let mut reader = AseReader::at(data, base);

    let num_slice_keys = reader.dword()?;
    let flags = reader.dword()?;
    let _reserved = reader.dword()?;
    let name = reader.string()?;

    let mut slice_keys: Vec<SliceKey> = Vec::with_capacity(num_slice_keys.min(1024) as usize);
    for _id in 0..num_slice_keys {
        let from_frame = reader.dword()?;
        let origin_x = reader.long()?;
        let origin_y = reader.long()?;
        let width = reader.dword()?;
        let height = reader.dword()?;
        let slice9 = if flags & 1 != 0 {
            let center_x = reader.long()?;
            let center_y = reader.long()?;
            let center_width = reader.dword()?;
            let center_height = reader.dword()?;
            Some((center_x, center_y, center_width, center_height))
        } else {
            None
        };
        let pivot = if flags & 2 != 0 {
            let pivot_x = reader.long()?;
            let pivot_y = reader.long()?;
            Some((pivot_x, pivot_y))
        } else {
            None
        };

        slice_keys.push(SliceKey {
            from_frame,
            origin: (origin_x, origin_y),
            size: (width, height),
            slice9,
            pivot,
        });
    }

    Ok(Slice {
        name,
        keys: slice_keys,
        user_data: None,
    })
}
