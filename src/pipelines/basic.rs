//! The lit, textured pipeline every model is drawn with.

use cgmath::Matrix4;

use crate::{
    config::Config,
    context::Context,
    data_structures::{instance::InstanceRaw, texture::Texture, vertex::{ModelVertex, Vertex}},
};

/**
 * Everything the instanced shader reads besides the mesh, the instance rows and the texture.
 *
 * Every vec3 is followed by a scalar so the struct has no padding and matches
 * the WGSL uniform layout byte for byte.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_pos: [f32; 3],
    pub alpha: f32,
    pub light_direction: [f32; 3],
    pub shininess: f32,
    pub light_ambient: [f32; 3],
    pub alpha_cutoff: f32,
    pub light_diffuse: [f32; 3],
    pub unlit: i32,
    pub light_specular: [f32; 3],
    pub time: f32,
}

impl SceneUniform {
    pub fn new(config: &Config) -> Self {
        let identity: [[f32; 4]; 4] = cgmath::Matrix4::from_scale(1.0).into();
        Self {
            view: identity,
            projection: identity,
            view_pos: [0.0, 0.0, 0.0],
            alpha: 1.0,
            light_direction: config.light.direction,
            shininess: config.light.shininess,
            light_ambient: config.light.ambient,
            alpha_cutoff: config.alpha_cutoff,
            light_diffuse: config.light.diffuse,
            unlit: 0,
            light_specular: config.light.specular,
            time: 0.0,
        }
    }

    /// Returns `false` if no matrix uniform is called `name`.
    pub fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) -> bool {
        let slot = match name {
            "view" => &mut self.view,
            "projection" => &mut self.projection,
            _ => return false,
        };
        *slot = value.into();
        true
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) -> bool {
        let slot = match name {
            "viewPos" => &mut self.view_pos,
            "dirLight.direction" => &mut self.light_direction,
            "dirLight.ambient" => &mut self.light_ambient,
            "dirLight.diffuse" => &mut self.light_diffuse,
            "dirLight.specular" => &mut self.light_specular,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        let slot = match name {
            "alpha" => &mut self.alpha,
            "alphaCutoff" => &mut self.alpha_cutoff,
            "shininess" => &mut self.shininess,
            "time" => &mut self.time,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        match name {
            "unlit" => self.unlit = value,
            _ => return false,
        }
        true
    }
}

/// Slots handed out per frame before the uniform buffer has to grow.
const INITIAL_BATCHES: u32 = 16;

/**
 * Hands out one aligned slot of the scene uniform buffer per draw batch.
 *
 * Every batch of a frame reads its own copy of [`SceneUniform`] through a
 * dynamic offset, so changing a uniform between two batches only affects
 * the second one.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlots {
    stride: u32,
    capacity: u32,
    next: u32,
}

impl UniformSlots {
    /// `alignment` is the device's `min_uniform_buffer_offset_alignment`.
    pub fn new(alignment: u32, capacity: u32) -> Self {
        let size = std::mem::size_of::<SceneUniform>() as u32;
        let alignment = alignment.max(1);
        Self {
            stride: size.div_ceil(alignment) * alignment,
            capacity: capacity.max(1),
            next: 0,
        }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn buffer_size(&self) -> u64 {
        self.stride as u64 * self.capacity as u64
    }

    /// Offset of the next free slot, `None` once every slot of this frame is taken.
    pub fn claim(&mut self) -> Option<wgpu::DynamicOffset> {
        if self.next >= self.capacity {
            return None;
        }
        let offset = self.next * self.stride;
        self.next += 1;
        Some(offset)
    }

    pub fn begin_frame(&mut self) {
        self.next = 0;
    }

    /// Double the capacity. Slots of the new buffer are handed out from the start.
    pub fn grow(&mut self) {
        self.capacity *= 2;
        self.next = 0;
    }
}

/// The uniform values being assigned plus the slots they get copied into.
#[derive(Debug, Clone)]
pub struct UniformBatches {
    pub uniform: SceneUniform,
    pub slots: UniformSlots,
}

impl UniformBatches {
    pub fn new(uniform: SceneUniform, slots: UniformSlots) -> Self {
        Self { uniform, slots }
    }

    /// Freeze the current values for the next batch.
    pub fn stage(&mut self) -> Option<(wgpu::DynamicOffset, SceneUniform)> {
        self.slots.claim().map(|offset| (offset, self.uniform))
    }
}

/**
 * The compiled instanced shader plus its scene uniforms.
 *
 * Uniforms are assigned by name and staged on the CPU. Each
 * [`use_program`](Self::use_program) call copies them into a fresh slot and
 * binds the pipeline for the following draws, so a flow can change e.g.
 * `alpha` between two models of the same frame.
 */
pub struct ShaderProgram {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    batches: UniformBatches,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Outgrown bindings still referenced by this frame's earlier batches.
    retired: Vec<(wgpu::Buffer, wgpu::BindGroup)>,
}

impl ShaderProgram {
    pub fn new(ctx: &Context, color_format: wgpu::TextureFormat, config: &Config) -> Self {
        let slots = UniformSlots::new(
            ctx.device.limits().min_uniform_buffer_offset_alignment,
            INITIAL_BATCHES,
        );
        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<SceneUniform>() as u64,
                        ),
                    },
                    count: None,
                }],
                label: Some("scene_bind_group_layout"),
            });
        let (buffer, bind_group) = mk_scene_binding(&ctx.device, &layout, &slots);
        let pipeline = mk_instanced_pipeline(&ctx.device, color_format, &ctx.texture_layout, &layout);

        Self {
            pipeline,
            layout,
            batches: UniformBatches::new(SceneUniform::new(config), slots),
            buffer,
            bind_group,
            retired: Vec::new(),
        }
    }

    pub fn uniform(&self) -> &SceneUniform {
        &self.batches.uniform
    }

    pub fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) {
        let applied = self.batches.uniform.set_mat4(name, value);
        warn_unknown(name, applied);
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        let applied = self.batches.uniform.set_vec3(name, value);
        warn_unknown(name, applied);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        let applied = self.batches.uniform.set_float(name, value);
        warn_unknown(name, applied);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        let applied = self.batches.uniform.set_int(name, value);
        warn_unknown(name, applied);
    }

    /// Start handing out uniform slots from the beginning again. Called once per frame.
    pub fn begin_frame(&mut self) {
        self.batches.slots.begin_frame();
        self.retired.clear();
    }

    /// Copy the current uniforms into a new slot and bind the pipeline with it.
    pub fn use_program(&mut self, ctx: &Context, render_pass: &mut wgpu::RenderPass<'_>) {
        let staged = match self.batches.stage() {
            Some(staged) => staged,
            None => {
                self.batches.slots.grow();
                log::debug!(
                    "Scene uniforms grown to {} batches per frame.",
                    self.batches.slots.capacity()
                );
                let (buffer, bind_group) = mk_scene_binding(&ctx.device, &self.layout, &self.batches.slots);
                let buffer = std::mem::replace(&mut self.buffer, buffer);
                let bind_group = std::mem::replace(&mut self.bind_group, bind_group);
                self.retired.push((buffer, bind_group));
                match self.batches.stage() {
                    Some(staged) => staged,
                    None => return,
                }
            }
        };
        let (offset, uniform) = staged;
        ctx.queue
            .write_buffer(&self.buffer, offset as u64, bytemuck::cast_slice(&[uniform]));
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(1, &self.bind_group, &[offset]);
    }
}

fn warn_unknown(name: &str, applied: bool) {
    if !applied {
        log::warn!("The instanced shader has no uniform called {:?}.", name);
    }
}

fn mk_scene_binding(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: &UniformSlots,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Buffer"),
        size: slots.buffer_size(),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<SceneUniform>() as u64),
            }),
        }],
        label: Some("scene_bind_group"),
    });
    (buffer, bind_group)
}

pub fn mk_instanced_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    texture_layout: &wgpu::BindGroupLayout,
    scene_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Instanced Pipeline Layout"),
        bind_group_layouts: &[texture_layout, scene_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Instanced Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("instanced.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        color_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Instanced Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<SceneUniform>(), 208);
        assert_eq!(std::mem::offset_of!(SceneUniform, view_pos), 128);
        assert_eq!(std::mem::offset_of!(SceneUniform, light_specular), 192);
    }

    #[test]
    fn named_uniforms_are_assigned() {
        let mut uniform = SceneUniform::new(&Config::default());
        assert!(uniform.set_vec3("dirLight.ambient", [0.1, 0.2, 0.3]));
        assert!(uniform.set_float("alpha", 0.6));
        assert!(uniform.set_int("unlit", 1));
        assert!(uniform.set_mat4("view", Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0))));
        assert_eq!(uniform.light_ambient, [0.1, 0.2, 0.3]);
        assert_eq!(uniform.alpha, 0.6);
        assert_eq!(uniform.unlit, 1);
        assert_eq!(uniform.view[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn unknown_uniforms_are_rejected() {
        let mut uniform = SceneUniform::new(&Config::default());
        let before = uniform;
        assert!(!uniform.set_float("windStrength", 3.0));
        assert!(!uniform.set_vec3("view", [0.0; 3]));
        assert!(!uniform.set_mat4("viewPos", Matrix4::from_scale(2.0)));
        assert_eq!(uniform, before);
    }

    #[test]
    fn slots_are_aligned_to_the_device() {
        let slots = UniformSlots::new(256, 4);
        assert_eq!(slots.stride(), 256);
        assert_eq!(slots.buffer_size(), 1024);
        assert_eq!(UniformSlots::new(64, 1).stride(), 256);
        assert_eq!(UniformSlots::new(1, 1).stride(), 208);
    }

    #[test]
    fn each_batch_gets_its_own_slot() {
        let mut batches = UniformBatches::new(SceneUniform::new(&Config::default()), UniformSlots::new(256, 4));

        batches.uniform.set_float("alpha", 0.6);
        let (clouds_offset, clouds) = batches.stage().unwrap();
        batches.uniform.set_float("alpha", 1.0);
        let (ships_offset, ships) = batches.stage().unwrap();

        assert_ne!(clouds_offset, ships_offset);
        assert_eq!(clouds.alpha, 0.6);
        assert_eq!(ships.alpha, 1.0);
    }

    #[test]
    fn slots_run_out_and_restart_each_frame() {
        let mut slots = UniformSlots::new(256, 2);
        assert_eq!(slots.claim(), Some(0));
        assert_eq!(slots.claim(), Some(256));
        assert_eq!(slots.claim(), None);

        slots.begin_frame();
        assert_eq!(slots.claim(), Some(0));

        slots.grow();
        assert_eq!(slots.capacity(), 4);
        assert_eq!(slots.buffer_size(), 1024);
        assert_eq!(slots.claim(), Some(0));
    }

    #[test]
    fn light_starts_from_config() {
        let config = Config::default();
        let uniform = SceneUniform::new(&config);
        assert_eq!(uniform.light_direction, config.light.direction);
        assert_eq!(uniform.alpha_cutoff, config.alpha_cutoff);
    }
}
