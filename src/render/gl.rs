//! OpenGL ES 3 head renderer built on `glow`.
//!
//! Uploads every drawable primitive once (interleaved VBO + u32 EBO + optional
//! texture) and re-uploads the morph mesh's vertices each frame.
//!
//! All methods require the GL context the renderer was created with to be
//! current on the calling thread.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use glow::HasContext;

use crate::error::{RenderError, Result};
use crate::face::model::{FaceModel, PrimitiveData, PrimitiveMode};
use crate::face::FaceFrame;

use super::Viewport;

const VERTEX_SHADER: &str = include_str!("face.vert");
const FRAGMENT_SHADER: &str = include_str!("face.frag");

/// Vertex layout matching the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

const VERTEX_STRIDE: i32 = std::mem::size_of::<Vertex>() as i32;

/// Interleave a primitive's attributes, taking positions from `positions`.
pub fn build_vertices(prim: &PrimitiveData, positions: &[Vec3]) -> Vec<Vertex> {
    positions
        .iter()
        .enumerate()
        .map(|(i, p)| Vertex {
            position: p.to_array(),
            normal: prim.normals.get(i).copied().unwrap_or(Vec3::Y).to_array(),
            uv: prim.uvs.get(i).copied().unwrap_or([0.0; 2]),
        })
        .collect()
}

/// GL enum for a primitive mode
pub fn gl_mode(mode: PrimitiveMode) -> u32 {
    match mode {
        PrimitiveMode::Points => glow::POINTS,
        PrimitiveMode::Lines => glow::LINES,
        PrimitiveMode::LineLoop => glow::LINE_LOOP,
        PrimitiveMode::LineStrip => glow::LINE_STRIP,
        PrimitiveMode::Triangles => glow::TRIANGLES,
        PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveMode::TriangleFan => glow::TRIANGLE_FAN,
    }
}

/// One primitive's GL objects.
struct DrawCall {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: glow::Buffer,
    texture: Option<glow::Texture>,
    index_count: i32,
    mode: u32,
    base_color: [f32; 4],
    /// CPU copy of the vertex data, positions replaced when morphed
    vertices: Vec<Vertex>,
}

struct Uniforms {
    mvp: Option<glow::UniformLocation>,
    diffuse_tex: Option<glow::UniformLocation>,
    has_texture: Option<glow::UniformLocation>,
    base_color: Option<glow::UniformLocation>,
}

/// The head renderer. Owns all GL objects for the loaded model.
pub struct GlFaceRenderer {
    gl: glow::Context,
    program: glow::Program,
    uniforms: Uniforms,
    /// draw_calls[mesh_idx][prim_idx]
    draw_calls: Vec<Vec<DrawCall>>,
    draw_order: Vec<usize>,
    clear_color: [f32; 4],
    viewport: Option<Viewport>,
}

impl GlFaceRenderer {
    /// Compile the shader program and upload the model.
    pub fn new(gl: glow::Context, model: &FaceModel, clear_color: [f32; 4]) -> Result<Self> {
        let program = unsafe { compile_program(&gl)? };

        let uniforms = unsafe {
            Uniforms {
                mvp: gl.get_uniform_location(program, "modelViewProjectionMatrix"),
                diffuse_tex: gl.get_uniform_location(program, "diffuseTex"),
                has_texture: gl.get_uniform_location(program, "hasTexture"),
                base_color: gl.get_uniform_location(program, "baseColor"),
            }
        };

        let mut draw_calls = Vec::with_capacity(model.meshes.len());
        for mesh in &model.meshes {
            let mut calls = Vec::with_capacity(mesh.primitives.len());
            for prim in &mesh.primitives {
                calls.push(unsafe { upload_primitive(&gl, prim)? });
            }
            draw_calls.push(calls);
        }

        tracing::info!(
            "GL face renderer ready: {} primitives",
            draw_calls.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            gl,
            program,
            uniforms,
            draw_calls,
            draw_order: model.draw_order.clone(),
            clear_color,
            viewport: None,
        })
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    /// Draw one frame.
    pub fn draw(&mut self, frame: &FaceFrame) {
        let gl = &self.gl;

        // Re-upload morphed vertices
        if let Some(mesh_idx) = frame.morph_mesh {
            if let Some(calls) = self.draw_calls.get_mut(mesh_idx) {
                for (call, positions) in calls.iter_mut().zip(frame.morphed.iter()) {
                    if positions.len() != call.vertices.len() {
                        continue;
                    }
                    for (v, p) in call.vertices.iter_mut().zip(positions.iter()) {
                        v.position = p.to_array();
                    }
                    unsafe {
                        gl.bind_buffer(glow::ARRAY_BUFFER, Some(call.vbo));
                        gl.buffer_sub_data_u8_slice(
                            glow::ARRAY_BUFFER,
                            0,
                            bytemuck::cast_slice(&call.vertices),
                        );
                    }
                }
            }
        }

        let [r, g, b, a] = self.clear_color;
        unsafe {
            if let Some(vp) = self.viewport {
                gl.viewport(vp.x, vp.y, vp.width, vp.height);
            }
            gl.clear_color(r, g, b, a);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.enable(glow::DEPTH_TEST);

            gl.use_program(Some(self.program));
            gl.uniform_matrix_4_f32_slice(
                self.uniforms.mvp.as_ref(),
                false,
                &frame.transform.to_cols_array(),
            );
            gl.uniform_1_i32(self.uniforms.diffuse_tex.as_ref(), 0);

            for &mesh_idx in &self.draw_order {
                let Some(calls) = self.draw_calls.get(mesh_idx) else {
                    continue;
                };
                for call in calls {
                    let [cr, cg, cb, ca] = call.base_color;
                    gl.uniform_4_f32(self.uniforms.base_color.as_ref(), cr, cg, cb, ca);
                    gl.uniform_1_i32(
                        self.uniforms.has_texture.as_ref(),
                        call.texture.is_some() as i32,
                    );
                    gl.active_texture(glow::TEXTURE0);
                    gl.bind_texture(glow::TEXTURE_2D, call.texture);

                    gl.bind_vertex_array(Some(call.vao));
                    gl.draw_elements(call.mode, call.index_count, glow::UNSIGNED_INT, 0);
                }
            }

            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.flush();
        }
    }

    /// Release GL objects. The context must still be alive.
    pub fn destroy(&mut self) {
        let gl = &self.gl;
        unsafe {
            for call in self.draw_calls.drain(..).flatten() {
                gl.delete_vertex_array(call.vao);
                gl.delete_buffer(call.vbo);
                gl.delete_buffer(call.ebo);
                if let Some(tex) = call.texture {
                    gl.delete_texture(tex);
                }
            }
            gl.delete_program(self.program);
        }
        tracing::debug!("GL face renderer destroyed");
    }
}

unsafe fn compile_program(gl: &glow::Context) -> Result<glow::Program> {
    let program = gl.create_program().map_err(RenderError::CreateObject)?;

    let mut shaders = Vec::with_capacity(2);
    for (kind, source) in [
        (glow::VERTEX_SHADER, VERTEX_SHADER),
        (glow::FRAGMENT_SHADER, FRAGMENT_SHADER),
    ] {
        let shader = gl.create_shader(kind).map_err(RenderError::CreateObject)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            gl.delete_program(program);
            return Err(RenderError::ShaderCompile(log).into());
        }
        gl.attach_shader(program, shader);
        shaders.push(shader);
    }

    gl.link_program(program);
    let linked = gl.get_program_link_status(program);

    for shader in shaders {
        gl.detach_shader(program, shader);
        gl.delete_shader(shader);
    }

    if !linked {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        return Err(RenderError::ProgramLink(log).into());
    }

    Ok(program)
}

unsafe fn upload_primitive(gl: &glow::Context, prim: &PrimitiveData) -> Result<DrawCall> {
    let vertices = build_vertices(prim, &prim.positions);

    let vao = gl.create_vertex_array().map_err(RenderError::CreateObject)?;
    gl.bind_vertex_array(Some(vao));

    let vbo = gl.create_buffer().map_err(RenderError::CreateObject)?;
    gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
    gl.buffer_data_u8_slice(
        glow::ARRAY_BUFFER,
        bytemuck::cast_slice(&vertices),
        glow::DYNAMIC_DRAW,
    );

    let ebo = gl.create_buffer().map_err(RenderError::CreateObject)?;
    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
    gl.buffer_data_u8_slice(
        glow::ELEMENT_ARRAY_BUFFER,
        bytemuck::cast_slice(&prim.indices),
        glow::STATIC_DRAW,
    );

    // position, normal, uv
    gl.enable_vertex_attrib_array(0);
    gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, VERTEX_STRIDE, 0);
    gl.enable_vertex_attrib_array(1);
    gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, VERTEX_STRIDE, 12);
    gl.enable_vertex_attrib_array(2);
    gl.vertex_attrib_pointer_f32(2, 2, glow::FLOAT, false, VERTEX_STRIDE, 24);

    gl.bind_vertex_array(None);

    let texture = match &prim.texture {
        Some(image) => {
            let tex = gl.create_texture().map_err(RenderError::CreateObject)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                image.width as i32,
                image.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(image.pixels.as_slice()),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);
            Some(tex)
        }
        None => None,
    };

    Ok(DrawCall {
        vao,
        vbo,
        ebo,
        texture,
        index_count: prim.indices.len() as i32,
        mode: gl_mode(prim.mode),
        base_color: prim.base_color,
        vertices,
    })
}
