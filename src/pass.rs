//! Host-framework hook: per-frame gatekeeping, regeneration, and deferred
//! export.

use crate::chain::MipChain;
use crate::core::{Error, GenerationConfig};
use crate::export::{export_chain, ExportOutcome};
use crate::generate::MipChainGenerator;
use crate::timing::TimingLog;

/// A render pass that keeps a reduction mip chain alive for a bound source
/// texture, rebuilding only when the effective configuration changes.
///
/// The chain cache is keyed by a config fingerprint, so rebinding a
/// different source, switching strategy, or changing the level cap all
/// invalidate it. Replacing or clearing the cache drops the previous run's
/// textures, which releases their device memory.
pub struct MipmapPass {
    generator: MipChainGenerator,
    config: GenerationConfig,
    chain: Option<MipChain>,
    export_pending: bool,
}

impl MipmapPass {
    pub fn new(device: &wgpu::Device, config: GenerationConfig) -> Self {
        MipmapPass {
            generator: MipChainGenerator::new(device),
            config,
            chain: None,
            export_pending: false,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Replace the pass configuration. Takes effect at the next
    /// [`on_setup`](Self::on_setup); the fingerprint check decides whether
    /// the cached chain survives.
    pub fn set_config(&mut self, config: GenerationConfig) {
        self.config = config;
    }

    /// The chain built by the last successful run, if any.
    pub fn chain(&self) -> Option<&MipChain> {
        self.chain.as_ref()
    }

    /// Once-per-eligible-frame setup hook.
    ///
    /// With no source bound this fails with [`Error::MissingSource`] and the
    /// cache stays stale. Otherwise the source's config fingerprint is
    /// compared against the cached chain's: on a match the call returns
    /// without issuing GPU work or timing records; on a mismatch the chain
    /// is rebuilt and the old one released. A successful rebuild with
    /// `export_to_cpu` set queues an export for
    /// [`run_pending_export`](Self::run_pending_export) instead of stalling
    /// the frame here.
    pub fn on_setup(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: Option<(&wgpu::Texture, &wgpu::TextureDescriptor)>,
    ) -> Result<(), Error> {
        let Some((texture, descriptor)) = source else {
            log::error!("mipmap pass has no source texture bound");
            return Err(Error::MissingSource);
        };

        let fingerprint = self.config.fingerprint(descriptor);
        if self.chain.as_ref().map(MipChain::fingerprint) == Some(fingerprint) {
            return Ok(());
        }

        let mut timing = match TimingLog::open(self.config.timing_log_path()) {
            Ok(log) => Some(log),
            Err(e) => {
                log::warn!("timing log unavailable, continuing without it: {}", e);
                None
            }
        };
        let chain = self.generator.generate(
            device,
            queue,
            texture,
            descriptor,
            &self.config,
            timing.as_mut(),
        )?;
        // Wholesale replacement; the superseded chain's textures drop here.
        self.chain = Some(chain);
        self.export_pending = self.config.export_to_cpu;
        Ok(())
    }

    /// Per-frame execute hook. The chain is built during setup; nothing
    /// happens here.
    pub fn execute(&self) {}

    /// Runs a queued export, if the last rebuild requested one. Call this
    /// outside the frame-critical path: every level's readback blocks until
    /// the device work has retired.
    pub fn run_pending_export(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Option<ExportOutcome> {
        if !self.export_pending {
            return None;
        }
        self.export_pending = false;
        self.chain
            .as_ref()
            .map(|chain| export_chain(device, queue, chain, &self.config))
    }

    /// External reconfiguration signal: the next setup call rebuilds
    /// unconditionally.
    pub fn invalidate(&mut self) {
        self.chain = None;
    }

    /// Cleanup hook: releases the cached chain and with it every device
    /// image it owns.
    pub fn cleanup(&mut self) {
        self.chain = None;
        self.export_pending = false;
    }
}
