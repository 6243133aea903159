#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Turns [Aseprite](https://www.aseprite.org/) files into ready-to-use game
content. This library directly reads the binary Aseprite files ([file format
specification][spec]), flattens the layers of every frame, packs the frames
into a texture atlas and writes the result in a compact binary format.

Note that this library can be rather slow when compiled without optimizations.
We recommend that you override the optimization settings for this dependency
in dev mode by adding the following to your `Cargo.toml`:

```text
[profile.dev.package.asepack]
opt-level = 2  # or 3
```

[spec]: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md

# Basic Usage

## Load file

Use [AsepriteFile::read] on the contents of a file.

```no_run
use asepack::AsepriteFile;
let data = std::fs::read("hero.aseprite")?;
let ase = AsepriteFile::read(&data)?;

println!("Size: {}x{}", ase.width(), ase.height());
println!("Frames: {}", ase.num_frames());
println!("Layers: {}", ase.num_layers());
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Flatten a frame

[Frame::image] blends together all visible layers the same way Aseprite
would. Use [composite_frame] to choose which layers take part.

```no_run
# use asepack::AsepriteFile;
use asepack::{composite_frame, CompositeOptions};
# let data = std::fs::read("hero.aseprite")?;
# let ase = AsepriteFile::read(&data)?;
let image = ase.frame(0).image()?;
let without_background = composite_frame(
    &ase,
    0,
    &CompositeOptions {
        include_background_layer: false,
        ..Default::default()
    },
)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Build a sprite sheet

[process_sprite_sheet] flattens all frames, merges identical ones and packs
them into one texture. Tags become animations. The result can be written
with [write_raw] and read back with [read_raw].

```no_run
# use asepack::AsepriteFile;
use asepack::{process_sprite_sheet, read_raw, to_bytes, ProcessorOptions, RawBundle};
# let data = std::fs::read("hero.aseprite")?;
# let ase = AsepriteFile::read(&data)?;
let options = ProcessorOptions {
    border_padding: 1,
    spacing: 1,
    ..Default::default()
};
let sheet = process_sprite_sheet(&ase, "hero", &options)?;
println!("Atlas: {}x{}", sheet.texture.width, sheet.texture.height);

let bytes = to_bytes(&RawBundle::SpriteSheet(sheet))?;
let restored = read_raw(&bytes)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

[pack_file] does all of the above in one call.

## Layers and cels

You can access a [Layer] by name or by ID. A cel is the intersection of a
frame and a layer.

```no_run
# use asepack::AsepriteFile;
# let data = std::fs::read("hero.aseprite")?;
# let ase = AsepriteFile::read(&data)?;
let layer = ase.layer_by_name("Layer 1").unwrap();
println!("Layer 1 is visible? {}", layer.is_visible());

let cel1 = layer.frame(0);
let cel2 = ase.frame(0).layer(layer.id());
assert_eq!(cel1.top_left(), cel2.top_left());
# Ok::<(), Box<dyn std::error::Error>>(())
```

*/

pub(crate) mod atlas;
pub(crate) mod blend;
pub(crate) mod cel;
pub(crate) mod composite;
pub(crate) mod dedup;
pub(crate) mod error;
pub(crate) mod file;
pub(crate) mod layer;
pub(crate) mod palette;
pub(crate) mod parse;
pub(crate) mod pixel;
pub(crate) mod process;
pub(crate) mod raw;
pub(crate) mod reader;
pub(crate) mod serialize;
pub(crate) mod slice;
pub(crate) mod tags;
pub(crate) mod tile;
pub(crate) mod tilemap;
pub(crate) mod tileset;
pub(crate) mod user_data;

/// A specialized `Result` type for Aseprite parsing functions.
pub type Result<T> = std::result::Result<T, AsepriteParseError>;

pub use atlas::{Atlas, AtlasPacker, Placement, MAX_ATLAS_DIMENSION};
pub use cel::Cel;
pub use composite::{composite_frame, composite_frames, CompositeOptions};
pub use dedup::{deduplicate, Deduplicated};
pub use error::{AsepriteParseError, Error, ProcessError, RawFormatError};
pub use file::{AsepriteFile, Frame, LayersIter, PixelFormat};
pub use layer::{BlendMode, Layer, LayerFlags, LayerType};
pub use palette::{ColorPalette, ColorPaletteEntry};
pub use process::{
    process_sprite, process_sprite_sheet, process_tilemap, process_tileset, ProcessorOptions,
};
pub use raw::{
    RawAnimationFrame, RawAnimationTag, RawBundle, RawRect, RawSlice, RawSliceKey, RawSprite,
    RawSpriteSheet, RawTexture, RawTextureRegion, RawTilemap, RawTilemapLayer, RawTilemapTile,
    RawTileset,
};
pub use serialize::{read_raw, to_bytes, write_raw, RAW_MAGIC, RAW_VERSION};
pub use slice::{Slice, SliceKey};
pub use tags::{AnimationDirection, Tag};
pub use tile::{Tile, TileId};
pub use tilemap::{Tilemap, TilemapData};
pub use tileset::{TileSize, Tileset, TilesetId, Tilesets};
pub use user_data::UserData;

/// Decode an Aseprite file, build its sprite sheet and serialize it.
///
/// `name` becomes the sheet name and the prefix of every region name.
pub fn pack_file(
    data: &[u8],
    name: &str,
    options: &ProcessorOptions,
) -> std::result::Result<Vec<u8>, Error> {
    let file = AsepriteFile::read(data)?;
    let sheet = process_sprite_sheet(&file, name, options)?;
    Ok(to_bytes(&RawBundle::SpriteSheet(sheet))?)
}
