//! wgpu compute backend
//!
//! Runs the same kernel as the CPU backend in `shaders/integrate.wgsl`.
//! Positions and velocities live in `vec4<f32>` storage arrays.

use common::constants::WORKGROUP_SIZE;
use common::{ComputeContext, GpuError};
use glam::Vec3;

use super::{check_lengths, ForceIntegrator};
use crate::error::SimulationError;
use crate::params::SimulationParameters;

/// Bytes per particle slot; positions and velocities are stored as `vec4<f32>`.
const SLOT_SIZE: u64 = std::mem::size_of::<[f32; 4]>() as u64;

fn shader_source() -> String {
    include_str!("../shaders/integrate.wgsl").replace("WORKGROUP_SIZE", &WORKGROUP_SIZE.to_string())
}

/// Storage and staging buffers sized for one particle count
struct GpuBuffers {
    capacity: usize,
    positions_in: wgpu::Buffer,
    positions_out: wgpu::Buffer,
    velocities: wgpu::Buffer,
    positions_staging: wgpu::Buffer,
    velocities_staging: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuBuffers {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        params: &wgpu::Buffer,
        capacity: usize,
    ) -> Self {
        let size = capacity as u64 * SLOT_SIZE;
        let storage = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        let staging = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        let positions_in = storage("Positions In");
        let positions_out = storage("Positions Out");
        let velocities = storage("Velocities");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Integrate Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: positions_in.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: positions_out.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: velocities.as_entire_binding(),
                },
            ],
        });

        Self {
            capacity,
            positions_in,
            positions_out,
            velocities,
            positions_staging: staging("Positions Staging"),
            velocities_staging: staging("Velocities Staging"),
            bind_group,
        }
    }
}

/// Integrator running the step as a wgpu compute pass.
///
/// Positions and velocities are uploaded every step and read back after the
/// dispatch, so the simulation state stays on the host.
pub struct GpuIntegrator {
    context: ComputeContext,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    buffers: Option<GpuBuffers>,
}

impl GpuIntegrator {
    pub fn new(context: ComputeContext) -> Self {
        let device = &context.device;

        let storage_entry = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Integrate Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, false),
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Integrate Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Integrate Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source().into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Integrate Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        let params_buffer = common::create_uniform_buffer(device, &SimulationParameters::default());

        Self {
            context,
            pipeline,
            bind_group_layout,
            params_buffer,
            buffers: None,
        }
    }

    /// Acquire a GPU and build the pipeline on it.
    pub fn new_blocking() -> Result<Self, GpuError> {
        Ok(Self::new(ComputeContext::new_blocking()?))
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_info.name
    }
}

/// Buffers in `slot`, reallocated when the particle count changed.
fn buffers_for<'a>(
    slot: &'a mut Option<GpuBuffers>,
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params: &wgpu::Buffer,
    count: usize,
) -> &'a GpuBuffers {
    if slot.as_ref().is_some_and(|b| b.capacity != count) {
        *slot = None;
    }
    slot.get_or_insert_with(|| {
        log::debug!("Allocating GPU particle buffers for {} particles", count);
        GpuBuffers::new(device, layout, params, count)
    })
}

fn to_slots(values: &[Vec3], w: f32) -> Vec<[f32; 4]> {
    values.iter().map(|v| v.extend(w).to_array()).collect()
}

fn read_slots(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
    out: &mut [Vec3],
) -> Result<(), GpuError> {
    let slice = staging.slice(..);
    let (sender, receiver) = flume::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    receiver
        .recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    {
        let view = slice.get_mapped_range();
        let slots: &[[f32; 4]] = bytemuck::cast_slice(&view);
        for (value, slot) in out.iter_mut().zip(slots) {
            *value = Vec3::new(slot[0], slot[1], slot[2]);
        }
    }
    staging.unmap();
    Ok(())
}

impl ForceIntegrator for GpuIntegrator {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn step(
        &mut self,
        params: &SimulationParameters,
        positions_in: &[Vec3],
        positions_out: &mut [Vec3],
        velocities: &mut [Vec3],
    ) -> Result<(), SimulationError> {
        check_lengths(positions_in, positions_out, velocities)?;
        let count = positions_in.len();
        if count == 0 {
            return Ok(());
        }

        let mut params = *params;
        params.particle_count = u32::try_from(count).unwrap_or(u32::MAX);

        let Self {
            context,
            pipeline,
            bind_group_layout,
            params_buffer,
            buffers,
        } = self;
        let (device, queue) = (&context.device, &context.queue);
        let buffers = buffers_for(buffers, device, bind_group_layout, params_buffer, count);

        queue.write_buffer(params_buffer, 0, bytemuck::bytes_of(&params));
        queue.write_buffer(
            &buffers.positions_in,
            0,
            bytemuck::cast_slice(&to_slots(positions_in, 1.0)),
        );
        queue.write_buffer(
            &buffers.velocities,
            0,
            bytemuck::cast_slice(&to_slots(velocities, 0.0)),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Integrate Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Integrate Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &buffers.bind_group, &[]);
            pass.dispatch_workgroups((count as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
        }

        let size = count as u64 * SLOT_SIZE;
        encoder.copy_buffer_to_buffer(&buffers.positions_out, 0, &buffers.positions_staging, 0, size);
        encoder.copy_buffer_to_buffer(&buffers.velocities, 0, &buffers.velocities_staging, 0, size);
        queue.submit(Some(encoder.finish()));

        read_slots(device, &buffers.positions_staging, positions_out)?;
        read_slots(device, &buffers.velocities_staging, velocities)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::CpuIntegrator;
    use crate::params::BlackHoleParams;

    #[test]
    fn test_shader_has_workgroup_size_substituted() {
        let source = shader_source();
        assert!(!source.contains("WORKGROUP_SIZE"));
        assert!(source.contains(&format!("@workgroup_size({})", WORKGROUP_SIZE)));
    }

    #[test]
    fn test_gpu_matches_cpu() {
        let mut gpu = match GpuIntegrator::new_blocking() {
            Ok(gpu) => gpu,
            Err(e) => {
                eprintln!("Skipping GPU test: {}", e);
                return;
            }
        };

        let n = 500;
        let positions: Vec<Vec3> = (0..n)
            .map(|i| {
                let t = i as f32;
                Vec3::new(t.cos() * 200.0, (t * 0.1).sin() * 20.0, t.sin() * 200.0)
            })
            .collect();
        let velocities: Vec<Vec3> = (0..n).map(|i| Vec3::new(0.0, 0.0, i as f32 * 0.001)).collect();

        let mut params = SimulationParameters {
            delta_time: 0.1,
            gravitational_constant: 1.0,
            smoothing_length: 10.0,
            particle_count: n as u32,
            ..Default::default()
        }
        .with_stride(7);
        params.black_holes[0] = BlackHoleParams {
            position: [0.0, 0.0, 0.0],
            mass: 5000.0,
            spin: 1.0,
            accretion_radius: 40.0,
            enabled: 1,
            _padding: 0.0,
        };

        let mut cpu_out = vec![Vec3::ZERO; n];
        let mut cpu_vel = velocities.clone();
        CpuIntegrator::new()
            .step(&params, &positions, &mut cpu_out, &mut cpu_vel)
            .unwrap();

        let mut gpu_out = vec![Vec3::ZERO; n];
        let mut gpu_vel = velocities.clone();
        gpu.step(&params, &positions, &mut gpu_out, &mut gpu_vel).unwrap();

        for (a, b) in cpu_out.iter().zip(&gpu_out) {
            assert!((*a - *b).length() <= 1e-3 * a.length().max(1.0), "{a} vs {b}");
        }
        for (a, b) in cpu_vel.iter().zip(&gpu_vel) {
            assert!((*a - *b).length() <= 1e-3 * a.length().max(1.0), "{a} vs {b}");
        }
    }

    #[test]
    fn test_buffers_follow_particle_count() {
        let mut gpu = match GpuIntegrator::new_blocking() {
            Ok(gpu) => gpu,
            Err(e) => {
                eprintln!("Skipping GPU test: {}", e);
                return;
            }
        };
        let params = SimulationParameters {
            delta_time: 0.5,
            gravitational_constant: 0.0,
            smoothing_length: 1.0,
            ..Default::default()
        };

        for n in [300, 40] {
            let positions: Vec<Vec3> = (0..n).map(|i| Vec3::splat(i as f32)).collect();
            let mut velocities = vec![Vec3::X; n];
            let mut out = vec![Vec3::ZERO; n];
            gpu.step(&params, &positions, &mut out, &mut velocities).unwrap();

            assert_eq!(gpu.buffers.as_ref().map(|b| b.capacity), Some(n));
            for (p0, p1) in positions.iter().zip(&out) {
                assert!((*p1 - (*p0 + Vec3::X * 0.5)).length() < 1e-5);
            }
        }
    }
}
