//! Integrated GPU context owning both the compute simulation and rendering.
//!
//! The simulation state lives in two ping-pong storage buffers. Two
//! immutable bind groups wire them to the pipelines in opposite
//! read/write orientations, and the step counter's parity selects which
//! orientation a frame uses. Compute and render share one bind group
//! layout so the same group serves both passes.

use std::sync::Arc;

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, Buffer, BufferUsages, CommandEncoder, CommandEncoderDescriptor,
    ComputePassDescriptor, ComputePipeline, Device, FragmentState, Instance, LoadOp,
    MultisampleState, Operations, PipelineLayoutDescriptor, PrimitiveState, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    ShaderStages, StoreOp, Surface, SurfaceConfiguration, TextureUsages, TextureView,
    TextureViewDescriptor, VertexState,
    util::{BufferInitDescriptor, DeviceExt},
};
use winit::window::Window;

use crate::rendering::{BACKGROUND_COLOR, QuadGeometry, Vertex};
use crate::sim::{GridConfig, StateBuffer, buffer_roles};
use crate::util::TickTimer;

/// The layout contract shared by the compute and render pipelines:
/// grid-size uniform, read-only "current" state, writable "next" state.
pub(crate) fn cell_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("cell state bind group layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT | ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::VERTEX | ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

/// The two cell-state buffers. Allocated once, seeded through the queue,
/// afterwards written only by the compute stage.
pub struct GridBuffers {
    buf_a: Buffer,
    buf_b: Buffer,
    cell_count: u32,
}

impl GridBuffers {
    pub fn new(device: &Device, config: &GridConfig) -> Self {
        let size = config.cell_count() as u64 * std::mem::size_of::<u32>() as u64;
        let make = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        Self {
            buf_a: make("cell state A"),
            buf_b: make("cell state B"),
            cell_count: config.cell_count(),
        }
    }

    /// Fill one buffer from `pattern(index) -> 0|1` and upload it.
    pub fn seed(&self, queue: &Queue, target: StateBuffer, pattern: impl Fn(u32) -> u32) {
        let cells: Vec<u32> = (0..self.cell_count).map(pattern).collect();
        queue.write_buffer(self.get(target), 0, bytemuck::cast_slice(&cells));
    }

    pub fn get(&self, which: StateBuffer) -> &Buffer {
        match which {
            StateBuffer::A => &self.buf_a,
            StateBuffer::B => &self.buf_b,
        }
    }
}

/// The two fixed read/write orientations of the state buffers. Built once;
/// ping-pong behavior comes from alternating which group is bound, never
/// from rebinding a group's buffers.
pub struct BindGroupPair {
    groups: [BindGroup; 2],
}

impl BindGroupPair {
    pub fn new(
        device: &Device,
        layout: &BindGroupLayout,
        grid_uniform: &Buffer,
        state: &GridBuffers,
    ) -> Self {
        let groups = [0u64, 1].map(|parity| {
            let roles = buffer_roles(parity);
            device.create_bind_group(&BindGroupDescriptor {
                label: Some(&format!(
                    "cell bind group ({:?} read, {:?} write)",
                    roles.read, roles.write
                )),
                layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: grid_uniform.as_entire_binding(),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: state.get(roles.read).as_entire_binding(),
                    },
                    BindGroupEntry {
                        binding: 2,
                        resource: state.get(roles.write).as_entire_binding(),
                    },
                ],
            })
        });
        Self { groups }
    }

    /// Pure lookup of the orientation for a step; no allocation.
    pub fn select(&self, step: u64) -> &BindGroup {
        &self.groups[(step % 2) as usize]
    }
}

pub(crate) fn build_compute_pipeline(device: &Device, layout: &BindGroupLayout) -> ComputePipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("life step shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("./sim/shader.wgsl").into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("life step pipeline layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("life step pipeline"),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: None,
        compilation_options: Default::default(),
        cache: None,
    })
}

fn build_render_pipeline(
    device: &Device,
    layout: &BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("cell render shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("./rendering/render.wgsl").into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("cell render pipeline layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("cell render pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

/// The compute and render pipelines plus the layout contract they share.
pub struct PipelineSet {
    pub cell_layout: BindGroupLayout,
    pub compute: ComputePipeline,
    pub render: RenderPipeline,
}

impl PipelineSet {
    pub fn new(device: &Device, surface_format: wgpu::TextureFormat) -> Self {
        let cell_layout = cell_bind_group_layout(device);
        let compute = build_compute_pipeline(device, &cell_layout);
        let render = build_render_pipeline(device, &cell_layout, surface_format);
        Self {
            cell_layout,
            compute,
            render,
        }
    }
}

/// Everything one simulation owns: state buffers, geometry, pipelines,
/// the bind group pair and the step counter.
pub struct SimContext {
    config: GridConfig,
    state: GridBuffers,
    geometry: QuadGeometry,
    pipelines: PipelineSet,
    bind_groups: BindGroupPair,
    step: u64,
}

impl SimContext {
    pub fn new(
        device: &Device,
        queue: &Queue,
        config: GridConfig,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let state = GridBuffers::new(device, &config);
        // Buffer B stays zero-filled: step 0 writes it before anything
        // reads it, so only A carries a starting pattern.
        state.seed(queue, StateBuffer::A, |i| config.seed.value(i));

        let grid_uniform = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("grid size uniform"),
            contents: bytemuck::cast_slice(&[config.width, config.height]),
            usage: BufferUsages::UNIFORM,
        });

        let pipelines = PipelineSet::new(device, surface_format);
        let bind_groups = BindGroupPair::new(device, &pipelines.cell_layout, &grid_uniform, &state);
        let geometry = QuadGeometry::new(device);

        Self {
            config,
            state,
            geometry,
            pipelines,
            bind_groups,
            step: 0,
        }
    }

    /// Record one tick: a compute dispatch over the whole grid, the step
    /// increment, then a render pass that observes the freshly written
    /// buffer. The caller submits the encoder as a single unit.
    pub fn encode_tick(&mut self, encoder: &mut CommandEncoder, view: &TextureView) {
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("life step pass"),
                ..Default::default()
            });
            pass.set_pipeline(&self.pipelines.compute);
            pass.set_bind_group(0, self.bind_groups.select(self.step), &[]);
            let (x, y) = self.config.dispatch_extent();
            pass.dispatch_workgroups(x, y, 1);
        }

        self.step += 1;
        log::trace!("advanced to step {}", self.step);

        // Post-increment selection: the render pass binds the orientation
        // whose read slot is the buffer the dispatch above just wrote.
        self.encode_render(encoder, view);
    }

    /// Record a render pass of the current state without advancing.
    pub fn encode_render(&self, encoder: &mut CommandEncoder, view: &TextureView) {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("grid render pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(BACKGROUND_COLOR.as_wgpu()),
                    store: StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.render);
        pass.set_bind_group(0, self.bind_groups.select(self.step), &[]);
        pass.set_vertex_buffer(0, self.geometry.buffer.slice(..));
        pass.draw(0..self.geometry.vertex_count(), 0..self.config.cell_count());
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn state(&self) -> &GridBuffers {
        &self.state
    }
}

/// Windowed GPU context: device, presentation surface, simulation context
/// and the tick timer driving it.
pub struct GpuLifeRenderer {
    #[allow(dead_code)]
    instance: Instance, // Keep instance alive for the lifetime of the renderer
    device: Device,
    queue: Queue,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    sim: SimContext,
    ticker: TickTimer,
    window: Arc<Window>,
}

impl GpuLifeRenderer {
    pub async fn new(window: Arc<Window>, config: GridConfig) -> Result<Self, anyhow::Error> {
        let instance = Instance::new(&wgpu::InstanceDescriptor::default());

        // Create surface first to find a compatible adapter
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await?;

        log::info!("using adapter: {:?}", adapter.get_info());

        let downlevel_caps = adapter.get_downlevel_capabilities();
        if !downlevel_caps
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(anyhow::anyhow!("adapter does not support compute shaders"));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lifegrid device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "simulating a {}x{} grid, one step per {:?}",
            config.width,
            config.height,
            config.tick_interval
        );

        let sim = SimContext::new(&device, &queue, config, surface_format);
        let ticker = TickTimer::new(config.tick_interval);

        Ok(Self {
            instance,
            device,
            queue,
            surface,
            surface_config,
            sim,
            ticker,
            window,
        })
    }

    /// Draw one frame. Advances the simulation first when a tick is due,
    /// otherwise re-renders the current generation.
    pub fn redraw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        if self.ticker.tick_due() {
            self.sim.encode_tick(&mut encoder, &view);
        } else {
            self.sim.encode_render(&mut encoder, &view);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.device, &self.surface_config);
        }
    }

    /// Re-apply the current surface configuration after a lost surface.
    pub fn reconfigure_surface(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Call after rendering to keep the animation loop going.
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn step_count(&self) -> u64 {
        self.sim.step_count()
    }
}
