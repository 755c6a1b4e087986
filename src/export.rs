//! CPU readback and PNG export of a completed chain.

use std::path::PathBuf;

use image::{ImageFormat, RgbaImage};

use crate::chain::MipChain;
use crate::core::{Error, GenerationConfig};

/// What an export pass accomplished. Failures are per level; one level's
/// failure never aborts the remaining levels.
#[derive(Debug, Default)]
pub struct ExportOutcome {
    /// Paths written, one per successfully exported level.
    pub written: Vec<PathBuf>,
    /// Levels that failed, with the error that stopped them.
    pub failed: Vec<(u32, Error)>,
}

impl ExportOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reads every level of `chain` back to host memory and writes one PNG per
/// level as `{output_dir}/{source_name}_mipLevel_{i}.png`, overwriting
/// existing files.
///
/// Each readback is a blocking GPU synchronization point; call this off the
/// frame-critical path. Directory-creation failure is logged and each level
/// then fails individually when its file cannot be written.
pub fn export_chain(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    chain: &MipChain,
    config: &GenerationConfig,
) -> ExportOutcome {
    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        log::error!(
            "could not create export directory `{}`: {}",
            config.output_dir.display(),
            e
        );
    }

    let mut outcome = ExportOutcome::default();
    for index in 0..chain.level_count() {
        let level = index as u32;
        let path = config.export_path(level);
        match export_level(device, queue, chain, index, &path) {
            Ok(()) => {
                log::info!(
                    "saved `{}` level {} to `{}`",
                    config.source_name,
                    level,
                    path.display()
                );
                outcome.written.push(path);
            }
            Err(e) => {
                log::error!("export of level {} failed: {}", level, e);
                outcome.failed.push((level, e));
            }
        }
    }
    outcome
}

fn export_level(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    chain: &MipChain,
    index: usize,
    path: &std::path::Path,
) -> Result<(), Error> {
    let lvl = chain.level(index);
    let pixels = chain.readback_level(device, queue, index)?;
    let image = RgbaImage::from_raw(lvl.width, lvl.height, pixels).ok_or_else(|| {
        Error::Readback {
            level: index as u32,
            reason: "readback size does not match level dimensions".to_string(),
        }
    })?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| Error::ExportIo {
            level: index as u32,
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ReductionStrategy;
    use crate::generate::MipChainGenerator;
    use crate::util::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn build_chain(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &GenerationConfig,
        width: u32,
        height: u32,
    ) -> MipChain {
        let descriptor = wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: MipChainGenerator::required_source_usage() | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        };
        let texture = device.create_texture(&descriptor);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &checkerboard_rgba8(width, height, 4),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            descriptor.size,
        );
        let generator = MipChainGenerator::new(device);
        generator
            .generate(device, queue, &texture, &descriptor, config, None)
            .unwrap()
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn export_creates_directory_and_one_png_per_level() {
        init();
        futures::executor::block_on(async {
            let (_instance, _adapter, device, queue) = wgpu_setup().await;
            let dir = tempfile::tempdir().unwrap();
            let mut config = GenerationConfig::new("checker", ReductionStrategy::Avg);
            // Point at a directory that does not exist yet.
            config.output_dir = dir.path().join("exports");
            config.export_to_cpu = true;

            let chain = build_chain(&device, &queue, &config, 64, 64);
            let outcome = export_chain(&device, &queue, &chain, &config);

            assert!(outcome.is_complete());
            assert_eq!(outcome.written.len(), chain.level_count());
            for level in 0..chain.level_count() as u32 {
                let path = config.export_path(level);
                assert!(path.exists(), "missing {}", path.display());
                let img = image::open(&path).unwrap().to_rgba8();
                let expected = (64u32 >> level).max(1);
                assert_eq!(img.dimensions(), (expected, expected));
            }
        });
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn export_failure_is_per_level_and_does_not_abort() {
        init();
        futures::executor::block_on(async {
            let (_instance, _adapter, device, queue) = wgpu_setup().await;
            let dir = tempfile::tempdir().unwrap();
            let mut config = GenerationConfig::new("checker", ReductionStrategy::Avg);
            // A file where the output directory should be makes every
            // level's write fail while the loop still visits all of them.
            let blocker = dir.path().join("blocked");
            std::fs::write(&blocker, b"not a directory").unwrap();
            config.output_dir = blocker;

            let chain = build_chain(&device, &queue, &config, 16, 16);
            let outcome = export_chain(&device, &queue, &chain, &config);

            assert!(outcome.written.is_empty());
            assert_eq!(outcome.failed.len(), chain.level_count());
            for (i, (level, error)) in outcome.failed.iter().enumerate() {
                assert_eq!(*level, i as u32);
                assert!(matches!(error, Error::ExportIo { .. }));
            }
        });
    }
}
