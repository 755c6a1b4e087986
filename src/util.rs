/// Utilities used throughout the project. Not part of the official API.
use crate::core::ReductionStrategy;

/// Round `value` up to the next multiple of `alignment`.
pub fn align_to(value: u32, alignment: u32) -> u32 {
    let remainder = value % alignment;
    if remainder == 0 {
        value
    } else {
        value + alignment - remainder
    }
}

/// CPU reference for one reduction step. Mirrors the kernel's footprint
/// policy exactly: output (x, y) reduces the four taps of the 2x2 block at
/// (2x, 2y), coordinates clamped to the input bounds. Input and output are
/// tightly packed RGBA8, stride == width.
#[doc(hidden)]
pub fn cpu_reduce_rgba8(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    strategy: ReductionStrategy,
) -> Vec<u8> {
    assert_eq!(src.len(), (src_width * src_height * 4) as usize);
    let dst_width = (src_width / 2).max(1);
    let dst_height = (src_height / 2).max(1);
    let tap = |x: u32, y: u32, c: usize| -> u8 {
        let x = x.min(src_width - 1);
        let y = y.min(src_height - 1);
        src[((y * src_width + x) * 4) as usize + c]
    };
    let mut dst = vec![0u8; (dst_width * dst_height * 4) as usize];
    for y in 0..dst_height {
        for x in 0..dst_width {
            for c in 0..4 {
                let taps = [
                    tap(2 * x, 2 * y, c),
                    tap(2 * x + 1, 2 * y, c),
                    tap(2 * x, 2 * y + 1, c),
                    tap(2 * x + 1, 2 * y + 1, c),
                ];
                let value = match strategy {
                    ReductionStrategy::Min => *taps.iter().min().unwrap(),
                    ReductionStrategy::Max => *taps.iter().max().unwrap(),
                    ReductionStrategy::Avg => {
                        let sum: u32 = taps.iter().map(|&t| t as u32).sum();
                        ((sum as f32 / 4.0).round() as u32).min(255) as u8
                    }
                };
                dst[((y * dst_width + x) * 4) as usize + c] = value;
            }
        }
    }
    dst
}

#[doc(hidden)]
pub fn checkerboard_rgba8(width: u32, height: u32, n: u32) -> Vec<u8> {
    use std::iter;

    (0..width * height)
        .flat_map(|id| {
            let x = id % width;
            let y = id / width;
            let v = (((x / n + y / n) % 2) * 255) as u8;
            iter::once(v)
                .chain(iter::once(v))
                .chain(iter::once(v))
                .chain(iter::once(255))
        })
        .collect()
}

/// Deterministic pseudo-random RGBA8 pattern for reduction tests.
#[doc(hidden)]
pub fn noise_rgba8(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..width * height * 4)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 24) as u8
        })
        .collect()
}

#[doc(hidden)]
#[allow(dead_code)]
pub async fn wgpu_setup() -> (wgpu::Instance, wgpu::Adapter, wgpu::Device, wgpu::Queue) {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        })
        .await
        .expect("Failed to find an appropriate adapter");
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await
        .expect("Failed to create device");
    (instance, adapter, device, queue)
}
