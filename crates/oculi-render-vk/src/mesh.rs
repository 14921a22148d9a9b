// SPDX-License-Identifier: CEPL-1.0
use crate::memory::{create_buffer_and_memory, upload_via_staging};
use anyhow::{Context, Result};
use ash::vk;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 3],
}

/// (outward normal, u, v, colour) per face, with `u x v == normal`.
const FACES: [([f32; 3], [f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.9, 0.2, 0.2]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.2, 0.9, 0.9]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.2, 0.9, 0.2]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.9, 0.2, 0.9]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.2, 0.2, 0.9]),
    ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.9, 0.9, 0.2]),
];

/// Axis-aligned cube centred on the origin, one flat colour per face, CCW outward.
pub(crate) fn cube(half: f32) -> (Vec<Vertex>, Vec<u32>) {
    let mut verts = Vec::with_capacity(24);
    let mut idxs = Vec::with_capacity(36);
    for (n, u, v, color) in FACES {
        let base = verts.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let pos = std::array::from_fn(|k| half * (n[k] + su * u[k] + sv * v[k]));
            verts.push(Vertex { pos, color });
        }
        idxs.extend([0, 1, 2, 0, 2, 3].map(|i| base + i));
    }
    (verts, idxs)
}

/// Device-local vertex and index buffers for one static mesh.
#[derive(Default)]
pub(crate) struct Mesh {
    pub vbuf: vk::Buffer,
    pub vbuf_mem: vk::DeviceMemory,
    pub ibuf: vk::Buffer,
    pub ibuf_mem: vk::DeviceMemory,
    pub index_count: u32,
}

impl Mesh {
    /// Uploads into `self`, so handles created before a failure are still released by
    /// [`Mesh::destroy`].
    pub(crate) unsafe fn upload(
        &mut self,
        device: &ash::Device,
        props: &vk::PhysicalDeviceMemoryProperties,
        queue: vk::Queue,
        cmd_pool: vk::CommandPool,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<()> {
        let vbytes: &[u8] = bytemuck::cast_slice(vertices);
        let ibytes: &[u8] = bytemuck::cast_slice(indices);

        (self.vbuf, self.vbuf_mem) = create_buffer_and_memory(
            device,
            props,
            vbytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )
        .context("vertex buffer")?;
        upload_via_staging(device, props, queue, cmd_pool, self.vbuf, vbytes)
            .context("vertex upload")?;

        (self.ibuf, self.ibuf_mem) = create_buffer_and_memory(
            device,
            props,
            ibytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )
        .context("index buffer")?;
        upload_via_staging(device, props, queue, cmd_pool, self.ibuf, ibytes)
            .context("index upload")?;

        self.index_count = indices.len() as u32;
        Ok(())
    }

    pub(crate) unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_buffer(self.vbuf, None);
        device.free_memory(self.vbuf_mem, None);
        device.destroy_buffer(self.ibuf, None);
        device.free_memory(self.ibuf_mem, None);
        *self = Mesh::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oculi_math::Vec3;

    #[test]
    fn cube_has_six_quads() {
        let (v, i) = cube(0.5);
        assert_eq!(v.len(), 24);
        assert_eq!(i.len(), 36);
        assert!(i.iter().all(|&k| (k as usize) < v.len()));
        assert!(v
            .iter()
            .all(|vx| vx.pos.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6)));
    }

    #[test]
    fn cube_faces_wind_outward() {
        let (v, i) = cube(1.0);
        for tri in i.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|k| Vec3::from(v[k as usize].pos));
            let normal = (b - a).cross(c - a);
            let centre = (a + b + c) / 3.0;
            assert!(normal.dot(centre) > 0.0, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn vertex_layout_is_two_packed_vec3() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }
}
