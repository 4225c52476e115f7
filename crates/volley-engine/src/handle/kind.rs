//! Resource kind markers.
//!
//! Each marker is an uninhabited type used only as the `K` parameter of
//! [`Handle<K>`](super::Handle). [`ResourceKindId`] names the kind at runtime so
//! that type-erased release paths can dispatch on it.

use core::fmt;

/// Runtime identifier of a resource kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ResourceKindId {
    VertexShader,
    PixelShader,
    SurfaceShader,
    VertexFormat,
    PipelineState,
    Buffer,
    DrawQueue,
}

impl ResourceKindId {
    pub const ALL: [ResourceKindId; 7] = [
        ResourceKindId::VertexShader,
        ResourceKindId::PixelShader,
        ResourceKindId::SurfaceShader,
        ResourceKindId::VertexFormat,
        ResourceKindId::PipelineState,
        ResourceKindId::Buffer,
        ResourceKindId::DrawQueue,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ResourceKindId::VertexShader => "vertex shader",
            ResourceKindId::PixelShader => "pixel shader",
            ResourceKindId::SurfaceShader => "surface shader",
            ResourceKindId::VertexFormat => "vertex format",
            ResourceKindId::PipelineState => "pipeline state",
            ResourceKindId::Buffer => "buffer",
            ResourceKindId::DrawQueue => "draw queue",
        }
    }
}

impl fmt::Display for ResourceKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time resource kind.
pub trait ResourceKind: 'static {
    const ID: ResourceKindId;
}

macro_rules! resource_kinds {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub enum $name {}

            impl ResourceKind for $name {
                const ID: ResourceKindId = ResourceKindId::$name;
            }
        )*
    };
}

resource_kinds!(
    VertexShader,
    PixelShader,
    SurfaceShader,
    VertexFormat,
    PipelineState,
    Buffer,
    DrawQueue,
);
