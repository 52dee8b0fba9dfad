use std::sync::mpsc::channel;

use wgpu::{
    BufferDescriptor, BufferUsages, CommandEncoderDescriptor, ComputePassDescriptor,
    ComputePipeline, Device, Instance, Queue,
    util::{BufferInitDescriptor, DeviceExt},
};

use crate::gpu::{BindGroupPair, GridBuffers, build_compute_pipeline, cell_bind_group_layout};
use crate::sim::{GridConfig, StateBuffer, buffer_roles};

/// Surface-free simulation context. Shares the buffer, bind-group and
/// kernel components with the windowed renderer but owns its own device,
/// and adds GPU-to-CPU state readback.
pub struct ComputeContext {
    device: Device,
    queue: Queue,
    state: GridBuffers,
    bind_groups: BindGroupPair,
    pipeline: ComputePipeline,
    config: GridConfig,
    step: u64,
}

impl ComputeContext {
    pub async fn create(config: GridConfig) -> Result<Self, anyhow::Error> {
        let instance = Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;

        let downlevel_caps = adapter.get_downlevel_capabilities();
        if !downlevel_caps
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(anyhow::anyhow!("adapter does not support compute shaders"));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lifegrid headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let state = GridBuffers::new(&device, &config);
        let grid_uniform = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("grid size uniform"),
            contents: bytemuck::cast_slice(&[config.width, config.height]),
            usage: BufferUsages::UNIFORM,
        });
        let layout = cell_bind_group_layout(&device);
        let bind_groups = BindGroupPair::new(&device, &layout, &grid_uniform, &state);
        let pipeline = build_compute_pipeline(&device, &layout);

        Ok(Self {
            device,
            queue,
            state,
            bind_groups,
            pipeline,
            config,
            step: 0,
        })
    }

    /// Upload a starting pattern into one of the state buffers.
    pub fn seed(&self, target: StateBuffer, pattern: impl Fn(u32) -> u32) {
        self.state.seed(&self.queue, target, pattern);
    }

    /// Dispatch one simulation step and advance the counter.
    pub fn step(&mut self) {
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("headless step encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("life step pass"),
                ..Default::default()
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, self.bind_groups.select(self.step), &[]);
            let (x, y) = self.config.dispatch_extent();
            pass.dispatch_workgroups(x, y, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.step += 1;
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Read back the latest generation: the buffer the next step would
    /// consume as its read side.
    pub fn read_current(&self) -> Result<Vec<u32>, anyhow::Error> {
        self.read_state(buffer_roles(self.step).read)
    }

    /// Copy one state buffer into a staging buffer and map it.
    pub fn read_state(&self, which: StateBuffer) -> Result<Vec<u32>, anyhow::Error> {
        let src = self.state.get(which);
        let staging = self.device.create_buffer(&BufferDescriptor {
            label: Some("state readback staging"),
            size: src.size(),
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor::default());
        encoder.copy_buffer_to_buffer(src, 0, &staging, 0, None);
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = channel();
        staging.map_async(wgpu::MapMode::Read, .., move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;
        rx.recv()??;

        let view = staging.get_mapped_range(..);
        let cells: Vec<u32> = bytemuck::cast_slice(view.as_ref()).to_vec();
        Ok(cells)
    }
}
