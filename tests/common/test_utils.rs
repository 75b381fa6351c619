#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use flow_instancing::{
    data_structures::instance::InstanceRaw,
    gpu::{BufferRole, GpuBackend, InstancedDraw},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBuffer {
    pub id: usize,
    pub label: String,
    pub role: BufferRole,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTexture {
    pub id: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
}

/// One instanced draw as the GPU would have seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub vertex_buffer: usize,
    pub index_buffer: usize,
    pub instance_buffer: usize,
    pub texture: Option<usize>,
    pub index_count: u32,
    pub instance_count: u32,
    pub rows: Vec<InstanceRaw>,
}

/// A GPU backend that only remembers what it was asked to do.
#[derive(Default)]
pub struct RecordingGpu {
    next_id: Cell<usize>,
    pub created: RefCell<Vec<(String, BufferRole)>>,
    pub writes: RefCell<Vec<String>>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn created_with_role(&self, role: BufferRole) -> usize {
        self.created.borrow().iter().filter(|(_, r)| *r == role).count()
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }
}

impl GpuBackend for RecordingGpu {
    type Buffer = RecordedBuffer;
    type Texture = RecordedTexture;
    type Pass<'pass> = Vec<RecordedDraw>;

    fn create_buffer(&self, label: &str, contents: &[u8], role: BufferRole) -> RecordedBuffer {
        self.created.borrow_mut().push((label.to_string(), role));
        RecordedBuffer {
            id: self.next_id(),
            label: label.to_string(),
            role,
            contents: contents.to_vec(),
        }
    }

    fn write_buffer(&self, buffer: &mut RecordedBuffer, label: &str, contents: &[u8]) {
        self.writes.borrow_mut().push(label.to_string());
        buffer.contents = contents.to_vec();
    }

    fn create_texture(&self, label: &str, image: &image::RgbaImage) -> RecordedTexture {
        RecordedTexture {
            id: self.next_id(),
            label: label.to_string(),
            width: image.width(),
            height: image.height(),
        }
    }

    fn draw_instanced(&self, pass: &mut Vec<RecordedDraw>, draw: InstancedDraw<'_, Self>) {
        let rows = draw
            .instances
            .contents
            .chunks_exact(std::mem::size_of::<InstanceRaw>())
            .map(bytemuck::pod_read_unaligned::<InstanceRaw>)
            .collect();
        pass.push(RecordedDraw {
            vertex_buffer: draw.vertices.id,
            index_buffer: draw.indices.id,
            instance_buffer: draw.instances.id,
            texture: draw.texture.map(|texture| texture.id),
            index_count: draw.index_count,
            instance_count: draw.instance_count,
            rows,
        });
    }
}

/// Translation column of a recorded instance row.
pub fn row_position(row: &InstanceRaw) -> [f32; 3] {
    let [x, y, z, _] = row.model[3];
    [x, y, z]
}

pub fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn write_png(dir: &std::path::Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([90, 120, 200, 255]))
        .save(&path)
        .unwrap();
    path
}
