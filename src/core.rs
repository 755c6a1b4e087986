use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The operator a reduction kernel applies to each output pixel's
/// input footprint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReductionStrategy {
    /// Component-wise minimum over the footprint.
    Min,
    /// Component-wise maximum over the footprint.
    Max,
    /// Unweighted arithmetic mean over the footprint.
    Avg,
}

impl ReductionStrategy {
    /// The numeric selector the compute kernel consumes: 0=Min, 1=Max, 2=Avg.
    pub fn selector(self) -> u32 {
        match self {
            ReductionStrategy::Min => 0,
            ReductionStrategy::Max => 1,
            ReductionStrategy::Avg => 2,
        }
    }
}

/// Per-run generation settings. Supplied once by the caller and never
/// mutated by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Name of the source texture, used for export filenames and as part of
    /// the config fingerprint.
    pub source_name: String,
    pub strategy: ReductionStrategy,
    /// Number of levels to build. 0 derives the full chain down to a level
    /// whose larger dimension is 1.
    pub level_count: u32,
    /// When set, the completed chain is read back and written to
    /// `output_dir` as one PNG per level.
    pub export_to_cpu: bool,
    pub output_dir: PathBuf,
}

impl GenerationConfig {
    pub fn new(source_name: impl Into<String>, strategy: ReductionStrategy) -> Self {
        Self {
            source_name: source_name.into(),
            strategy,
            level_count: 0,
            export_to_cpu: false,
            output_dir: PathBuf::from("output_mipmaps"),
        }
    }

    /// Hash of the effective configuration: source identity (name,
    /// dimensions, format) plus strategy and level count. A cached chain is
    /// reused only while this value is unchanged.
    pub fn fingerprint(&self, source_descriptor: &wgpu::TextureDescriptor) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.source_name.hash(&mut hasher);
        source_descriptor.size.width.hash(&mut hasher);
        source_descriptor.size.height.hash(&mut hasher);
        source_descriptor.format.hash(&mut hasher);
        self.strategy.hash(&mut hasher);
        self.level_count.hash(&mut hasher);
        hasher.finish()
    }

    /// Path of the append-only timing log shared by successive runs.
    pub fn timing_log_path(&self) -> PathBuf {
        self.output_dir.join("MipmapGenerationTimesAndPixels.txt")
    }

    /// Path of one exported level: `{output_dir}/{source_name}_mipLevel_{i}.png`.
    pub fn export_path(&self, level: u32) -> PathBuf {
        self.output_dir
            .join(format!("{}_mipLevel_{}.png", self.source_name, level))
    }
}

/// An error that occurred during mip chain generation or export.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no source texture is bound; assign a source before generating")]
    MissingSource,
    #[error("unsupported texture dimension `{0:?}`; the source must be TextureDimension::D2")]
    UnsupportedDimension(wgpu::TextureDimension),
    #[error("unsupported texture format `{0:?}`; the source must be Rgba8Unorm")]
    UnsupportedFormat(wgpu::TextureFormat),
    #[error("unsupported texture usage `{0:?}`; the source usage must contain TextureUsages::COPY_SRC")]
    UnsupportedUsage(wgpu::TextureUsages),
    #[error("source texture has a zero extent ({width}x{height})")]
    ZeroSizedSource { width: u32, height: u32 },
    #[error("timing log `{path}`: {source}")]
    TimingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("export of level {level} to `{path}` failed: {source}")]
    ExportIo {
        level: u32,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("readback of level {level} failed: {reason}")]
    Readback { level: u32, reason: String },
}

impl Error {
    pub(crate) fn timing_io(path: &Path, source: std::io::Error) -> Self {
        Error::TimingIo {
            path: path.to_path_buf(),
            source,
        }
    }
}
