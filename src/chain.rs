//! GPU-resident mip chain storage.

use crate::core::Error;
use crate::plan::MipLevelDescriptor;
use crate::util::align_to;

const BYTES_PER_PIXEL: u32 = 4; // Rgba8Unorm

/// One level of the chain: an Rgba8Unorm texture plus the views used to bind
/// it as the next level's input and as this level's kernel output.
pub struct ChainLevel {
    pub texture: wgpu::Texture,
    /// Bound as `texture_2d<f32>` input to the next level's dispatch.
    pub read_view: wgpu::TextureView,
    /// Bound as `texture_storage_2d<rgba8unorm, write>` kernel output.
    pub write_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl ChainLevel {
    /// Allocate the texture backing one level. Each level is its own
    /// single-mip texture; nothing here requests automatic mip generation.
    pub(crate) fn new(device: &wgpu::Device, desc: &MipLevelDescriptor) -> Self {
        let label = format!("mipchain level {}", desc.level);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST // level 0 blit from the source
                | wgpu::TextureUsages::COPY_SRC, // export readback
            view_formats: &[],
        });
        let read_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let write_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        ChainLevel {
            texture,
            read_view,
            write_view,
            width: desc.width,
            height: desc.height,
        }
    }
}

/// An ordered sequence of GPU-resident level images, finest (index 0) to
/// coarsest. Owns every texture it holds; dropping the chain releases all of
/// them, so replacing a cached chain frees the previous run's device memory.
pub struct MipChain {
    levels: Vec<ChainLevel>,
    fingerprint: u64,
}

impl MipChain {
    pub(crate) fn new(levels: Vec<ChainLevel>, fingerprint: u64) -> Self {
        MipChain {
            levels,
            fingerprint,
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> &ChainLevel {
        &self.levels[index]
    }

    pub fn levels(&self) -> &[ChainLevel] {
        &self.levels
    }

    /// Fingerprint of the configuration this chain was built from.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Read one level back to host memory as tightly packed RGBA8 bytes,
    /// row-major, stride == width.
    ///
    /// Synchronous: stalls until all device work writing this level has
    /// retired. Diagnostic/export path only, never the hot rendering path.
    pub fn readback_level(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        index: usize,
    ) -> Result<Vec<u8>, Error> {
        let lvl = &self.levels[index];
        let level = index as u32;

        let unpadded_bytes_per_row = lvl.width * BYTES_PER_PIXEL;
        let padded_bytes_per_row =
            align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer_size = (padded_bytes_per_row * lvl.height) as u64;

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mipchain readback"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mipchain readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &lvl.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(lvl.height),
                },
            },
            wgpu::Extent3d {
                width: lvl.width,
                height: lvl.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| Error::Readback {
                level,
                reason: "map_async callback never fired".to_string(),
            })?
            .map_err(|e| Error::Readback {
                level,
                reason: e.to_string(),
            })?;

        // Strip the row padding the copy alignment forced on us.
        let padded = slice.get_mapped_range();
        let mut pixels =
            Vec::with_capacity((unpadded_bytes_per_row * lvl.height) as usize);
        for y in 0..lvl.height as usize {
            let row_beg = y * padded_bytes_per_row as usize;
            let row_end = row_beg + unpadded_bytes_per_row as usize;
            pixels.extend_from_slice(&padded[row_beg..row_end]);
        }
        drop(padded);
        readback.unmap();
        Ok(pixels)
    }
}
