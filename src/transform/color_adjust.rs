//! Color-correction transform: brightness, contrast, saturation and gamma
//! in a single fragment pass.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::error::PipelineError;
use crate::frame::TextureHandle;
use crate::gpu::{GpuHandle, TEXTURE_FORMAT};
use crate::pipeline::AsyncFrameDescriptor;

use super::FrameTransform;

const COLOR_ADJUST_SHADER: &str = r#"
    struct Params {
        brightness: f32,  // -1.0 to 1.0
        contrast: f32,    // 0.0 to 2.0
        saturation: f32,  // 0.0 to 2.0
        gamma: f32,       // 0.1 to 3.0
    }

    @group(0) @binding(0) var<uniform> params: Params;
    @group(0) @binding(1) var src: texture_2d<f32>;
    @group(0) @binding(2) var src_sampler: sampler;

    struct VertexOut {
        @builtin(position) pos: vec4<f32>,
        @location(0) uv: vec2<f32>,
    }

    @vertex
    fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOut {
        let x = f32(i32(vertex_index / 2u)) * 4.0 - 1.0;
        let y = f32(i32(vertex_index & 1u)) * 4.0 - 1.0;

        var out: VertexOut;
        out.pos = vec4<f32>(x, y, 0.0, 1.0);
        out.uv = vec2<f32>(x * 0.5 + 0.5, 1.0 - (y * 0.5 + 0.5));
        return out;
    }

    @fragment
    fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
        var color = textureSample(src, src_sampler, in.uv).rgb;

        // Brightness
        color = color + params.brightness;

        // Contrast (around 0.5 midpoint)
        color = (color - 0.5) * params.contrast + 0.5;

        // Saturation (convert to luminance, blend)
        let luma = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
        color = mix(vec3<f32>(luma), color, params.saturation);

        // Gamma correction
        color = pow(max(color, vec3<f32>(0.0)), vec3<f32>(1.0 / params.gamma));

        return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
    }
"#;

/// Color-correction settings
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ColorAdjustParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub gamma: f32,
}

impl Default for ColorAdjustParams {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            gamma: 1.0,
        }
    }
}

struct Resources {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
    sampler: Sampler,
}

impl Resources {
    fn new(device: &Device) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("color adjust shader"),
            source: ShaderSource::Wgsl(COLOR_ADJUST_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("color adjust bind group layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("color adjust pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("color adjust pipeline"),
            layout: Some(&pipeline_layout),
            cache: None,
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(ColorTargetState {
                    format: TEXTURE_FORMAT,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("color adjust sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            layout,
            sampler,
        }
    }
}

/// Renders the source through a color-correction pass into a texture the
/// strategy owns. The output texture is reused across frames of the same
/// size.
pub struct ColorAdjustTransform {
    params: ColorAdjustParams,
    resources: Option<Resources>,
    output: Option<TextureHandle>,
}

impl ColorAdjustTransform {
    pub fn new(params: ColorAdjustParams) -> Self {
        Self {
            params,
            resources: None,
            output: None,
        }
    }

    pub fn set_params(&mut self, params: ColorAdjustParams) {
        self.params = params;
    }

    fn ensure_output(&mut self, gpu: &GpuHandle<'_>, width: u32, height: u32) -> TextureHandle {
        match &self.output {
            Some(texture) if texture.width() == width && texture.height() == height => {
                texture.clone()
            }
            _ => {
                let texture = gpu.create_texture("color adjust output", width, height);
                self.output = Some(texture.clone());
                texture
            }
        }
    }
}

impl FrameTransform for ColorAdjustTransform {
    fn transform(
        &mut self,
        gpu: &GpuHandle<'_>,
        frame: &AsyncFrameDescriptor,
    ) -> Result<TextureHandle, PipelineError> {
        if self.resources.is_none() {
            self.resources = Some(Resources::new(gpu.device));
        }
        let output = self.ensure_output(gpu, frame.width, frame.height);
        let Some(resources) = self.resources.as_ref() else {
            return Err(PipelineError::Transform("pipeline setup failed".into()));
        };

        let params = gpu.device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some("color adjust params"),
            contents: bytemuck::bytes_of(&self.params),
            usage: BufferUsages::UNIFORM,
        });

        let bind_group = gpu.device.create_bind_group(&BindGroupDescriptor {
            label: Some("color adjust bind group"),
            layout: &resources.layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::TextureView(&frame.texture.view()),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: BindingResource::Sampler(&resources.sampler),
                },
            ],
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("color adjust encoder"),
            });

        let output_view = output.view();
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("color adjust pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &output_view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_pipeline(&resources.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(output)
    }
}
