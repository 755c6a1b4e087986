/*!
Build reduction mip chains for [wgpu](https://github.com/gfx-rs/wgpu) textures.

Instead of hardware box filtering, each level is produced by a compute kernel
whose reduction operator is selectable per run: `Min`, `Max`, or `Avg`. Min
and Max chains suit conservative depth/occlusion pyramids; Avg gives a
visually smooth LOD chain. Every level beyond the base consumes the previous
level's output, never the original image.

The crate also carries the diagnostic side channels the pipeline was built
for: an append-only per-level timing log, and an export path that reads each
level back to the CPU and writes it out as a PNG.

## Usage

Add this to your `Cargo.toml`:

```toml
[dependencies]
wgpu-mipchain = "0.1"
```

Example usage:

```no_run
use wgpu_mipchain::{GenerationConfig, MipChainGenerator, ReductionStrategy};

fn example(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<(), wgpu_mipchain::Error> {
    // create and upload data to a source texture
    let descriptor = wgpu::TextureDescriptor {
        label: None,
        size: wgpu::Extent3d {
            width: 512,
            height: 512,
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
    // upload_data_to_texture(&texture);
    // build a 10-level max-reduction chain (1 + log2(512))
    let generator = MipChainGenerator::new(device);
    let config = GenerationConfig::new("example", ReductionStrategy::Max);
    let chain = generator.generate(device, queue, &texture, &descriptor, &config, None)?;
    assert_eq!(chain.level_count(), 10);
    Ok(())
}
```

For a host render loop, [`MipmapPass`] wraps the generator behind a
setup/execute/cleanup hook with fingerprint-based regeneration gatekeeping
and deferred export.
*/
mod chain;
mod core;
mod export;
mod generate;
mod pass;
mod plan;
mod timing;

#[doc(hidden)]
pub mod util;

#[doc(inline)]
pub use crate::chain::{ChainLevel, MipChain};
#[doc(inline)]
pub use crate::core::{Error, GenerationConfig, ReductionStrategy};
#[doc(inline)]
pub use crate::export::{export_chain, ExportOutcome};
#[doc(inline)]
pub use crate::generate::MipChainGenerator;
#[doc(inline)]
pub use crate::pass::MipmapPass;
#[doc(inline)]
pub use crate::plan::{full_chain_length, plan_levels, MipLevelDescriptor};
#[doc(inline)]
pub use crate::timing::{TimingLog, TimingRecord};
