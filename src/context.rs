//! The wgpu device and everything models share on it.

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{self, BoundTexture},
    gpu::{BufferRole, GpuBackend, InstancedDraw},
};

/// GPU handles plus the shared texture layout and the default texture bound
/// for models without a texture of their own.
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub texture_layout: wgpu::BindGroupLayout,
    pub default_texture: BoundTexture,
}

/// A GPU buffer that remembers how it was created so it can be regrown.
#[derive(Debug)]
pub struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    pub role: BufferRole,
}

impl Context {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let texture_layout = texture::texture_layout(&device);
        let default_texture = texture::Texture::white(&device, &queue).bind(&device, &texture_layout);
        Self {
            device,
            queue,
            texture_layout,
            default_texture,
        }
    }

    /// Request an adapter and a device without any surface attached.
    pub async fn headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        let (device, queue) = request_device(&adapter).await?;
        Ok(Self::new(device, queue))
    }
}

pub(crate) async fn request_device(
    adapter: &wgpu::Adapter,
) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .context("device request failed")?;
    Ok((device, queue))
}

impl GpuBackend for Context {
    type Buffer = GpuBuffer;
    type Texture = BoundTexture;
    type Pass<'pass> = wgpu::RenderPass<'pass>;

    fn create_buffer(&self, label: &str, contents: &[u8], role: BufferRole) -> GpuBuffer {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: role.usages(),
            });
        GpuBuffer { buffer, role }
    }

    fn write_buffer(&self, buffer: &mut GpuBuffer, label: &str, contents: &[u8]) {
        if contents.len() as wgpu::BufferAddress > buffer.buffer.size() {
            log::debug!(
                "Growing {} from {} to {} bytes.",
                label,
                buffer.buffer.size(),
                contents.len()
            );
            *buffer = self.create_buffer(label, contents, buffer.role);
        } else if !contents.is_empty() {
            self.queue.write_buffer(&buffer.buffer, 0, contents);
        }
    }

    fn create_texture(&self, label: &str, image: &image::RgbaImage) -> BoundTexture {
        texture::Texture::from_rgba(&self.device, &self.queue, image, label)
            .bind(&self.device, &self.texture_layout)
    }

    fn draw_instanced(&self, pass: &mut wgpu::RenderPass<'_>, draw: InstancedDraw<'_, Self>) {
        let texture = draw.texture.unwrap_or(&self.default_texture);
        pass.set_bind_group(0, &texture.bind_group, &[]);
        pass.set_vertex_buffer(0, draw.vertices.buffer.slice(..));
        pass.set_vertex_buffer(1, draw.instances.buffer.slice(..));
        pass.set_index_buffer(draw.indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..draw.index_count, 0, 0..draw.instance_count);
    }
}
