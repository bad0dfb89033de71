use crate::atlas::SubTextureHandle;
use mosaic_geocoord::QuadAddress;
use thiserror::Error;

pub type TileResult<T> = Result<T, TileError>;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("image has a zero width or height")]
    EmptyImage,
    #[error("texture for frame {frame} could not be built: {reason}")]
    TextureBuild { frame: usize, reason: String },
    #[error("frame {frame} exceeds the image depth of {depth}")]
    FrameOutOfRange { frame: usize, depth: u32 },
    #[error("the atlas has no room left for a {size}x{size} cell")]
    AtlasFull { size: u32 },
    #[error("unknown sub texture {0:?}")]
    UnknownTexture(SubTextureHandle),
    #[error("invalid quad address {0}")]
    InvalidAddress(QuadAddress),
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
    #[error("failed to encode config: {0}")]
    ConfigEncode(#[from] ron::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
