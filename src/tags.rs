use crate::{reader::AseReader, user_data::UserData, AsepriteParseError, Result};

/// A tag is a grouping of one or more frames.
///
/// Tags are usually used to describe one animation, e.g., "walk" or "idle".
/// Aseprite does not require tag names to be unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub(crate) name: String,
    pub(crate) from_frame: u16,
    pub(crate) to_frame: u16,
    pub(crate) animation_direction: AnimationDirection,
    pub(crate) repeat: u16,
    pub(crate) color: [u8; 3],
    pub(crate) user_data: Option<UserData>,
}

impl Tag {
    /// Tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First frame included in the tag.
    pub fn from_frame(&self) -> u32 {
        self.from_frame as u32
    }

    /// Last frame included in the tag (inclusive).
    pub fn to_frame(&self) -> u32 {
        self.to_frame as u32
    }

    /// Order in which the tag's frames are played.
    pub fn animation_direction(&self) -> AnimationDirection {
        self.animation_direction
    }

    /// How often the animation plays. `0` means forever.
    pub fn repeat(&self) -> u16 {
        self.repeat
    }

    /// Tag color as shown in the timeline. A color in the tag's user data
    /// takes precedence.
    pub fn color(&self) -> [u8; 4] {
        match self.user_data.as_ref().and_then(|ud| ud.color) {
            Some(color) => color,
            None => [self.color[0], self.color[1], self.color[2], 255],
        }
    }

    /// The tag's user data, if any is present.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    pub(crate) fn set_user_data(&mut self, user_data: UserData) {
        self.user_data = Some(user_data);
    }
}

/// Playback order of the frames in a [Tag].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationDirection {
    /// From first to last frame.
    Forward,
    /// From last to first frame.
    Reverse,
    /// First to last, then back to first.
    PingPong,
    /// Last to first, then back to last.
    PingPongReverse,
}

pub(crate) fn parse_chunk(data: &[u8], base: u64) -> Result<Vec<Tag>> {
    let mut reader = AseReader::at(data, base);

    let num_tags = reader.word()?;
    reader.skip_reserved(8)?;

    let mut result = Vec::with_capacity(num_tags as usize);

    for _tag in 0..num_tags {
        let from_frame = reader.word()?;
        let to_frame = reader.word()?;
        let anim_dir = reader.byte()?;
        let repeat = reader.word()?;
        reader.skip_reserved(6)?;
        let color = [reader.byte()?, reader.byte()?, reader.byte()?];
        let _extra = reader.byte()?;
        let name = reader.string()?;
        if from_frame > to_frame {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Tag '{}' ends before it starts: {}..{}",
                name, from_frame, to_frame
            )));
        }
        let animation_direction = parse_animation_direction(anim_dir)?;
        result.push(Tag {
            name,
            from_frame,
            to_frame,
            animation_direction,
            repeat,
            color,
            user_data: None,
        });
    }

    Ok(result)
}

fn parse_animation_direction(id: u8) -> Result<AnimationDirection> {
    match id {
        0 => Ok(AnimationDirection::Forward),
        1 => Ok(AnimationDirection::Reverse),
        2 => Ok(AnimationDirection::PingPong),
        3 => Ok(AnimationDirection::PingPongReverse),
        _ => Err(AsepriteParseError::InvalidInput(format!(
            "Unknown animation direction: {}",
            id
        ))),
    }
}
