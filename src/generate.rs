//! Per-level GPU dispatch of the reduction kernel.

use std::time::Instant;

use wgpu::util::DeviceExt;

use crate::chain::{ChainLevel, MipChain};
use crate::core::{Error, GenerationConfig};
use crate::plan::plan_levels;
use crate::timing::{TimingLog, TimingRecord};

/// Fixed kernel tiling: `@workgroup_size(8, 8, 1)` in `reduce.wgsl`.
const WORKGROUP_SIZE: u32 = 8;

/// Uniform block consumed by the kernel. Layout must match `ReduceParams`
/// in `shaders/reduce.wgsl`: four u32 fields, 16 bytes total.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ReduceParams {
    target_level: u32,
    out_width: u32,
    out_height: u32,
    strategy: u32,
}

/// Builds reduction mip chains with a compute kernel.
///
/// Compiling the kernel is the expensive part; create one generator and
/// reuse it for every regeneration.
pub struct MipChainGenerator {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl MipChainGenerator {
    /// Returns the texture usage a source texture requires for chain
    /// generation.
    pub fn required_source_usage() -> wgpu::TextureUsages {
        wgpu::TextureUsages::COPY_SRC
    }

    /// Compiles the embedded reduction kernel and builds the compute
    /// pipeline. wgpu validates the module and the `reduce` entry point
    /// here, before any generation is attempted.
    pub fn new(device: &wgpu::Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("reduce.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/reduce.wgsl").into()),
        });
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mipchain reduce layout"),
                entries: &[
                    // Previous level, read via textureLoad.
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        },
                        count: None,
                    },
                    // Current level, random-access writes.
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: wgpu::TextureFormat::Rgba8Unorm,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    },
                    // ReduceParams uniform.
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mipchain pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("mipchain reduce"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "reduce",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        MipChainGenerator {
            pipeline,
            bind_group_layout,
        }
    }

    /// Validation gate: all configuration errors surface here, before any
    /// GPU work is issued.
    fn validate(source_descriptor: &wgpu::TextureDescriptor) -> Result<(), Error> {
        if source_descriptor.dimension != wgpu::TextureDimension::D2 {
            return Err(Error::UnsupportedDimension(source_descriptor.dimension));
        }
        if source_descriptor.format != wgpu::TextureFormat::Rgba8Unorm {
            return Err(Error::UnsupportedFormat(source_descriptor.format));
        }
        if !source_descriptor
            .usage
            .contains(Self::required_source_usage())
        {
            return Err(Error::UnsupportedUsage(source_descriptor.usage));
        }
        let size = source_descriptor.size;
        if size.width == 0 || size.height == 0 {
            return Err(Error::ZeroSizedSource {
                width: size.width,
                height: size.height,
            });
        }
        Ok(())
    }

    /// Builds a full chain for `source`.
    ///
    /// Level 0 is a bit-exact copy of the source; every level `i >= 1` is the
    /// kernel's reduction of level `i - 1`. Dispatches are submitted one
    /// level at a time, so queue ordering serializes the producer-consumer
    /// chain. Each level's step is bracketed by `timing`; a timing write
    /// failure degrades to a warning and generation continues.
    pub fn generate(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &wgpu::Texture,
        source_descriptor: &wgpu::TextureDescriptor,
        config: &GenerationConfig,
        mut timing: Option<&mut TimingLog>,
    ) -> Result<MipChain, Error> {
        Self::validate(source_descriptor)?;

        let plan = plan_levels(
            source_descriptor.size.width,
            source_descriptor.size.height,
            config.level_count,
        );
        log::info!(
            "generating {} levels for `{}` ({}x{}, {:?})",
            plan.len(),
            config.source_name,
            source_descriptor.size.width,
            source_descriptor.size.height,
            config.strategy
        );

        let mut levels: Vec<ChainLevel> = Vec::with_capacity(plan.len());
        for desc in &plan {
            let started = Instant::now();

            let level = ChainLevel::new(device, desc);
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mipchain level"),
            });
            if desc.level == 0 {
                // The source already is the finest level: copy, don't filter.
                encoder.copy_texture_to_texture(
                    wgpu::ImageCopyTexture {
                        texture: source,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::ImageCopyTexture {
                        texture: &level.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::Extent3d {
                        width: desc.width,
                        height: desc.height,
                        depth_or_array_layers: 1,
                    },
                );
            } else {
                let previous = &levels[desc.level as usize - 1];
                let params = ReduceParams {
                    target_level: desc.level,
                    out_width: desc.width,
                    out_height: desc.height,
                    strategy: config.strategy.selector(),
                };
                let params_buffer =
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("ReduceParams"),
                        contents: bytemuck::bytes_of(&params),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("mipchain level bind group"),
                    layout: &self.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&previous.read_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&level.write_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: params_buffer.as_entire_binding(),
                        },
                    ],
                });
                {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("mipchain reduce"),
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(&self.pipeline);
                    pass.set_bind_group(0, &bind_group, &[]);
                    pass.dispatch_workgroups(
                        desc.width.div_ceil(WORKGROUP_SIZE),
                        desc.height.div_ceil(WORKGROUP_SIZE),
                        1,
                    );
                }
            }
            queue.submit(std::iter::once(encoder.finish()));

            let record = TimingRecord {
                level: desc.level,
                elapsed_ms: started.elapsed().as_secs_f64() * 1e3,
                pixel_count: desc.pixel_count(),
            };
            if let Some(timing_log) = timing.as_deref_mut() {
                if let Err(e) = timing_log.append(&record) {
                    log::warn!("timing record for level {} dropped: {}", desc.level, e);
                }
            }
            levels.push(level);
        }

        Ok(MipChain::new(
            levels,
            config.fingerprint(source_descriptor),
        ))
    }
}
