//! Shader loading, compilation and linking.
//!
//! GLSL sources are compiled with naga's GLSL front end and validated into IR
//! modules, one per stage. Linking checks that every varying the fragment stage
//! reads is written by the vertex stage with the same type. Nothing here needs
//! a GPU; the linked program becomes a render pipeline in
//! [`crate::render::background`].
//!
//! Diagnostics are capped at [`MAX_LOG_LEN`] characters, the size of the info
//! log buffer the first version of this tool read from the GL driver.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Handle, Module, Type, TypeInner};
use thiserror::Error;

/// Maximum number of characters kept from a compiler or linker diagnostic.
pub const MAX_LOG_LEN: usize = 511;

/// Pipeline stage a GLSL source is compiled for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors that can occur while loading, compiling or linking shaders.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The source file does not exist.
    #[error("shader source not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The source file exists but could not be read as UTF-8 text.
    #[error("shader source unreadable: {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stage failed to parse or validate.
    #[error("could not compile {stage} shader\n{log}")]
    Compile { stage: ShaderStage, log: String },

    /// The stages do not fit together, or do not fit the pipeline.
    #[error("could not link shader\n{log}")]
    Link { log: String },
}

/// Kind of resource a shader binds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ResourceKind {
    Texture,
    Sampler,
    Buffer,
}

/// One `layout(set = .., binding = ..)` resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResourceSlot {
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
}

/// Reads a whole shader source file.
///
/// A missing file is reported as [`ShaderError::NotFound`]; every other I/O
/// failure, including invalid UTF-8, as [`ShaderError::Unreadable`].
pub fn read_source(path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ShaderError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ShaderError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// A single validated shader stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    stage: ShaderStage,
    module: Module,
    entry_index: usize,
}

impl CompiledStage {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.module.entry_points[self.entry_index].name
    }

    /// User-defined inputs keyed by location.
    pub fn inputs(&self) -> BTreeMap<u32, TypeInner> {
        let mut out = BTreeMap::new();
        for arg in &self.function().arguments {
            collect_locations(&self.module, arg.ty, arg.binding.as_ref(), &mut out);
        }
        out
    }

    /// User-defined outputs keyed by location. Built-ins are skipped.
    pub fn outputs(&self) -> BTreeMap<u32, TypeInner> {
        let mut out = BTreeMap::new();
        if let Some(result) = &self.function().result {
            collect_locations(&self.module, result.ty, result.binding.as_ref(), &mut out);
        }
        out
    }

    /// Bound resources declared by the module, sorted by group then binding.
    pub fn resources(&self) -> Vec<ResourceSlot> {
        let mut slots: Vec<ResourceSlot> = self
            .module
            .global_variables
            .iter()
            .filter_map(|(_, var)| {
                let binding = var.binding.as_ref()?;
                let kind = match self.module.types[var.ty].inner {
                    TypeInner::Image { .. } => ResourceKind::Texture,
                    TypeInner::Sampler { .. } => ResourceKind::Sampler,
                    _ => ResourceKind::Buffer,
                };
                Some(ResourceSlot {
                    group: binding.group,
                    binding: binding.binding,
                    kind,
                })
            })
            .collect();
        slots.sort();
        slots
    }

    fn function(&self) -> &naga::Function {
        &self.module.entry_points[self.entry_index].function
    }

    fn create_module(&self, device: &wgpu::Device, label: &str) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(self.module.clone())),
        })
    }
}

/// Compiles one GLSL stage.
///
/// Parse and validation failures both surface as [`ShaderError::Compile`] with
/// naga's rendered diagnostic as the log.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let compile_error = |log: String| ShaderError::Compile {
        stage,
        log: truncate_log(&log),
    };

    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(stage.naga());
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| compile_error(errors.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|err| compile_error(err.emit_to_string(source)))?;

    let entry_index = module
        .entry_points
        .iter()
        .position(|ep| ep.stage == stage.naga())
        .ok_or_else(|| compile_error(format!("no {stage} entry point")))?;

    Ok(CompiledStage {
        stage,
        module,
        entry_index,
    })
}

/// A vertex and a fragment stage whose interfaces match.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
}

/// Links a vertex and a fragment stage.
///
/// Every fragment input location must be written by the vertex stage with an
/// identical type. Extra vertex outputs are allowed.
pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<LinkedProgram, ShaderError> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err(ShaderError::Link {
            log: format!(
                "expected a vertex and a fragment stage, got {} and {}",
                vertex.stage, fragment.stage
            ),
        });
    }

    let outputs = vertex.outputs();
    let mut problems = Vec::new();

    for (location, wanted) in fragment.inputs() {
        match outputs.get(&location) {
            None => problems.push(format!(
                "fragment input at location {location} ({}) is not written by the vertex stage",
                describe(&wanted)
            )),
            Some(written) if *written != wanted => problems.push(format!(
                "location {location}: vertex stage writes {}, fragment stage reads {}",
                describe(written),
                describe(&wanted)
            )),
            Some(_) => {}
        }
    }

    if !problems.is_empty() {
        return Err(ShaderError::Link {
            log: truncate_log(&problems.join("\n")),
        });
    }

    Ok(LinkedProgram { vertex, fragment })
}

/// Reads, compiles and links the two stages found at the given paths.
///
/// The source strings are dropped as soon as their stage is compiled.
pub fn load_program(vertex_path: &Path, fragment_path: &Path) -> Result<LinkedProgram, ShaderError> {
    let vertex = compile(ShaderStage::Vertex, &read_source(vertex_path)?)?;
    let fragment = compile(ShaderStage::Fragment, &read_source(fragment_path)?)?;
    let program = link(vertex, fragment)?;

    log::debug!(
        "linked {} + {} ({} varyings)",
        vertex_path.display(),
        fragment_path.display(),
        program.varyings().len()
    );
    Ok(program)
}

impl LinkedProgram {
    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    /// Vertex attribute inputs keyed by location.
    pub fn vertex_inputs(&self) -> BTreeMap<u32, TypeInner> {
        self.vertex.inputs()
    }

    /// Locations passed from the vertex to the fragment stage.
    pub fn varyings(&self) -> Vec<u32> {
        self.fragment.inputs().into_keys().collect()
    }

    /// Resources bound by either stage, deduplicated.
    pub fn resources(&self) -> Vec<ResourceSlot> {
        let mut slots = self.vertex.resources();
        slots.extend(self.fragment.resources());
        slots.sort();
        slots.dedup();
        slots
    }

    /// Checks the program against what a pipeline will feed it.
    ///
    /// Every vertex input needs an attribute of a matching format, and every
    /// resource the shaders bind needs a slot of the same kind. Unused
    /// attributes and slots are fine.
    pub fn check_pipeline(
        &self,
        attributes: &[wgpu::VertexAttribute],
        resources: &[ResourceSlot],
    ) -> Result<(), ShaderError> {
        let mut problems = Vec::new();

        for (location, ty) in self.vertex_inputs() {
            match attributes.iter().find(|a| a.shader_location == location) {
                None => problems.push(format!(
                    "vertex input at location {location} ({}) has no vertex attribute",
                    describe(&ty)
                )),
                Some(attr) if !vertex_format_matches(attr.format, &ty) => problems.push(format!(
                    "vertex input at location {location} is {} but the attribute is {:?}",
                    describe(&ty),
                    attr.format
                )),
                Some(_) => {}
            }
        }

        for slot in self.resources() {
            if !resources.contains(&slot) {
                problems.push(format!(
                    "{:?} at set {} binding {} is not provided by the pipeline",
                    slot.kind, slot.group, slot.binding
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ShaderError::Link {
                log: truncate_log(&problems.join("\n")),
            })
        }
    }

    /// Creates the GPU shader modules for both stages.
    pub(crate) fn create_modules(&self, device: &wgpu::Device) -> (wgpu::ShaderModule, wgpu::ShaderModule) {
        (
            self.vertex.create_module(device, "bg-gen vertex stage"),
            self.fragment.create_module(device, "bg-gen fragment stage"),
        )
    }
}

fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut BTreeMap<u32, TypeInner>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            out.insert(*location, module.types[ty].inner.clone());
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn vertex_format_matches(format: wgpu::VertexFormat, ty: &TypeInner) -> bool {
    use naga::VectorSize;

    let size = match format {
        wgpu::VertexFormat::Float32 => {
            return matches!(ty, TypeInner::Scalar(s) if *s == naga::Scalar::F32);
        }
        wgpu::VertexFormat::Float32x2 => VectorSize::Bi,
        wgpu::VertexFormat::Float32x3 => VectorSize::Tri,
        wgpu::VertexFormat::Float32x4 => VectorSize::Quad,
        _ => return false,
    };
    matches!(ty, TypeInner::Vector { size: s, scalar } if *s == size && *scalar == naga::Scalar::F32)
}

fn describe(ty: &TypeInner) -> String {
    fn scalar(s: naga::Scalar) -> String {
        let prefix = match s.kind {
            naga::ScalarKind::Float => "f",
            naga::ScalarKind::Sint => "i",
            naga::ScalarKind::Uint => "u",
            naga::ScalarKind::Bool => return "bool".to_string(),
            other => return format!("{other:?}"),
        };
        format!("{prefix}{}", u32::from(s.width) * 8)
    }

    match *ty {
        TypeInner::Scalar(s) => scalar(s),
        TypeInner::Vector { size, scalar: s } => format!("vec{}<{}>", size as u8, scalar(s)),
        ref other => format!("{other:?}"),
    }
}

/// Caps a diagnostic at [`MAX_LOG_LEN`] characters, never splitting a char.
pub fn truncate_log(log: &str) -> String {
    let log = log.trim_end();
    if log.is_empty() {
        return "no diagnostic available".to_string();
    }
    match log.char_indices().nth(MAX_LOG_LEN) {
        Some((end, _)) => log[..end].to_string(),
        None => log.to_string(),
    }
}
