//! Background image decoding and upload.
//!
//! Decoding and mip generation happen on the CPU before any window exists, so
//! a bad asset is reported without touching the GPU. The decoded pixels are
//! moved into [`BackgroundTexture::upload`] and released when it returns.

use std::io;
use std::path::{Path, PathBuf};

use image::{imageops, RgbaImage};
use thiserror::Error;

/// Errors that can occur while loading the background image.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("texture unreadable: {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not decode texture {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The image exceeds the device's 2D texture limit.
    #[error("texture is {width}x{height}, device limit is {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// A decoded image, always expanded to 8-bit RGBA.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source file (3 for RGB, 4 for RGBA, ...).
    pub channels: u8,
    pixels: RgbaImage,
}

impl DecodedImage {
    /// Tightly packed RGBA8 rows, top row first.
    pub fn pixels(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn mip_level_count(&self) -> u32 {
        mip_level_count(self.width, self.height)
    }
}

/// Reads and decodes the image at `path`.
pub fn decode_image(path: &Path) -> Result<DecodedImage, TextureError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => TextureError::NotFound {
            path: path.to_path_buf(),
        },
        _ => TextureError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;
    decode_bytes(path, &bytes)
}

/// Decodes an in-memory image. `path` is only used for error reporting.
pub fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<DecodedImage, TextureError> {
    let img = image::load_from_memory(bytes).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let channels = img.color().channel_count();
    let pixels = img.to_rgba8();
    let (width, height) = pixels.dimensions();

    log::debug!(
        "decoded {}: {width}x{height}, {channels} channels",
        path.display()
    );

    Ok(DecodedImage {
        width,
        height,
        channels,
        pixels,
    })
}

/// `floor(log2(max(width, height))) + 1`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Builds every level from `base` down to 1×1, each half the previous size
/// (never below 1) using a triangle filter.
pub fn build_mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height()) as usize;
    let mut levels = Vec::with_capacity(count);
    levels.push(base);

    while levels.len() < count {
        let prev = &levels[levels.len() - 1];
        let w = (prev.width() / 2).max(1);
        let h = (prev.height() / 2).max(1);
        let next = imageops::resize(prev, w, h, imageops::FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Repeat wrapping on U and V, linear filtering at every stage.
pub fn sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("bg-gen background sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    }
}

/// The uploaded background: texture with its full mip chain, view, sampler.
pub struct BackgroundTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl BackgroundTexture {
    /// Uploads `image` and every mip level derived from it.
    ///
    /// `srgb` selects an sRGB texture format so sampling into an sRGB surface
    /// round-trips the stored colors.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: DecodedImage,
        srgb: bool,
    ) -> Result<Self, TextureError> {
        let max = device.limits().max_texture_dimension_2d;
        if image.width > max || image.height > max {
            return Err(TextureError::TooLarge {
                width: image.width,
                height: image.height,
                max,
            });
        }

        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let mip_level_count = image.mip_level_count();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bg-gen background texture"),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, pixels) in build_mip_chain(image.pixels).iter().enumerate() {
            let (width, height) = pixels.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        log::debug!("uploaded background texture ({mip_level_count} mip levels, {format:?})");

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&sampler_descriptor());

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_red_2x2_png() {
        let red = RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let decoded = decode_bytes(Path::new("red.png"), &png_bytes(&red)).unwrap();

        assert_eq!(decoded.width, 2);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.channels, 4);
        assert_eq!(decoded.pixels().len(), 16);
        for texel in decoded.pixels().chunks(4) {
            assert_eq!(texel, [255, 0, 0, 255]);
        }
    }

    #[test]
    fn rgb_png_keeps_source_channel_count() {
        let rgb = image::RgbImage::from_pixel(3, 1, image::Rgb([0, 128, 255]));
        let mut out = Cursor::new(Vec::new());
        rgb.write_to(&mut out, image::ImageFormat::Png).unwrap();

        let decoded = decode_bytes(Path::new("rgb.png"), out.get_ref()).unwrap();
        assert_eq!(decoded.channels, 3);
        assert_eq!(decoded.pixels().len(), 3 * 4);
        assert_eq!(&decoded.pixels()[..4], &[0, 128, 255, 255]);
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let err = decode_bytes(Path::new("bg1.png"), b"\x89PNG\r\n\x1a\nnot really").unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
        assert!(err.to_string().contains("bg1.png"), "got: {err}");
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = std::env::temp_dir().join("bg-gen-definitely-missing.png");
        assert!(matches!(decode_image(&path), Err(TextureError::NotFound { .. })));
    }

    #[test]
    fn decode_image_reads_from_disk() {
        let dir = std::env::temp_dir().join(format!("bg-gen-texture-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("blue.png");
        let blue = RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 255, 255]));
        std::fs::write(&path, png_bytes(&blue)).unwrap();

        let decoded = decode_image(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.mip_level_count(), 3);
    }

    #[test]
    fn mip_level_counts() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(3, 1), 2);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(1152, 648), 11);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn mip_chain_halves_down_to_one_pixel() {
        let base = RgbaImage::from_pixel(8, 2, image::Rgba([10, 20, 30, 255]));
        let sizes: Vec<_> = build_mip_chain(base).iter().map(|l| l.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn mip_chain_of_uniform_image_stays_uniform() {
        let base = RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 255]));
        for level in build_mip_chain(base) {
            assert!(level.pixels().all(|p| p.0 == [200, 100, 50, 255]));
        }
    }

    #[test]
    fn sampler_repeats_and_filters_linearly() {
        let desc = sampler_descriptor();
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::Repeat);
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.mipmap_filter, wgpu::MipmapFilterMode::Linear);
    }
}
