//! Lazily sized GPU render target for publishing processed frames.

use wgpu::*;

use crate::frame::TextureHandle;

/// One render target texture, allocated on first use and re-allocated only
/// when the requested dimensions change. Released exactly once at teardown.
pub struct RenderTarget {
    format: TextureFormat,
    texture: Option<TextureHandle>,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            texture: None,
            width: 0,
            height: 0,
        }
    }

    /// Allocate or resize the backing texture. No-op when dimensions match.
    pub fn set_size(&mut self, device: &Device, width: u32, height: u32) {
        if self.texture.is_some() && self.width == width && self.height == height {
            return;
        }

        let texture = device.create_texture(&TextureDescriptor {
            label: Some("output target"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: self.format,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        self.texture = Some(TextureHandle::new(texture));
        self.width = width;
        self.height = height;
    }

    pub fn handle(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    pub fn view(&self) -> Option<TextureView> {
        self.texture.as_ref().map(|t| t.view())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Drop the backing texture. Safe to call more than once.
    pub fn release(&mut self) {
        self.texture = None;
        self.width = 0;
        self.height = 0;
    }
}
