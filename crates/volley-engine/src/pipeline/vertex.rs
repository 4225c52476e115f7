use crate::diagnostics::{emit, Diagnostic, Report};

/// Per-attribute data format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DataFormat {
    R32F,
    RG32F,
    RGB32F,
    RGBA32F,
    R32U,
    RG32U,
    RGB32U,
    RGBA32U,
    RG16,
    RGBA16,
    RG16F,
    RGBA16F,
    RG8,
    RGBA8,
}

impl DataFormat {
    /// Size of one attribute of this format, in bytes.
    pub const fn size(self) -> u32 {
        match self {
            DataFormat::R32F | DataFormat::R32U => 4,
            DataFormat::RG32F | DataFormat::RG32U => 8,
            DataFormat::RGB32F | DataFormat::RGB32U => 12,
            DataFormat::RGBA32F | DataFormat::RGBA32U => 16,
            DataFormat::RG16 | DataFormat::RG16F => 4,
            DataFormat::RGBA16 | DataFormat::RGBA16F => 8,
            DataFormat::RG8 => 2,
            DataFormat::RGBA8 => 4,
        }
    }
}

/// Input rate of a vertex element.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum VertexStep {
    #[default]
    PerVertex,
    PerInstance,
}

/// One element of a vertex format as declared by the caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexElement<'a> {
    pub semantic: &'a str,
    pub semantic_index: u32,
    pub format: DataFormat,
    pub slot: u32,
    pub offset: u32,
    pub step: VertexStep,
}

impl<'a> VertexElement<'a> {
    /// Per-vertex element in slot 0.
    pub const fn new(semantic: &'a str, format: DataFormat, offset: u32) -> Self {
        Self {
            semantic,
            semantic_index: 0,
            format,
            slot: 0,
            offset,
            step: VertexStep::PerVertex,
        }
    }
}

/// Validated, backend-neutral vertex layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Distance between consecutive vertices in bytes.
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location; equals the element's position in the declaration.
    pub location: u32,
    pub format: DataFormat,
    pub offset: u32,
    pub step: VertexStep,
}

/// Validates `elements` and derives the layout.
///
/// Returns `None` for an empty declaration or an element whose end does not
/// fit in `u32`. Every other finding is reported as a warning and the layout
/// is still produced: the stride covers the furthest byte any element touches.
pub fn validate_vertex_layout(
    elements: &[VertexElement<'_>],
    report: &mut Report<'_>,
) -> Option<VertexLayout> {
    if elements.is_empty() {
        emit(report, Diagnostic::error("vertex format declares no elements"));
        return None;
    }

    let mut packed_offset = 0u32;
    let mut stride = 0u32;
    let mut attributes = Vec::with_capacity(elements.len());

    for (i, e) in elements.iter().enumerate() {
        if e.offset != packed_offset {
            emit(
                report,
                Diagnostic::warning(format!(
                    "vertex element {}{} declares offset {} but packs at {}",
                    e.semantic, e.semantic_index, e.offset, packed_offset
                )),
            );
        }
        if e.slot != 0 {
            emit(
                report,
                Diagnostic::warning(format!(
                    "vertex element {}{} uses slot {}; draw queues bind slot 0 only",
                    e.semantic, e.semantic_index, e.slot
                )),
            );
        }
        if e.step == VertexStep::PerInstance {
            emit(
                report,
                Diagnostic::warning(format!(
                    "vertex element {}{} is per-instance; per-draw data is read from the shared parameter store",
                    e.semantic, e.semantic_index
                )),
            );
        }
        let duplicate = elements[..i]
            .iter()
            .any(|p| p.semantic == e.semantic && p.semantic_index == e.semantic_index);
        if duplicate {
            emit(
                report,
                Diagnostic::warning(format!(
                    "vertex semantic {}{} is declared more than once",
                    e.semantic, e.semantic_index
                )),
            );
        }

        let Some(end) = e.offset.checked_add(e.format.size()) else {
            emit(
                report,
                Diagnostic::error(format!(
                    "vertex element {}{} offset {} overflows the vertex stride",
                    e.semantic, e.semantic_index, e.offset
                )),
            );
            return None;
        };
        packed_offset = packed_offset.saturating_add(e.format.size());
        stride = stride.max(end);
        attributes.push(VertexAttribute {
            location: i as u32,
            format: e.format,
            offset: e.offset,
            step: e.step,
        });
    }

    Some(VertexLayout { stride, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;

    fn collect(elements: &[VertexElement<'_>]) -> (Option<VertexLayout>, Vec<Diagnostic>) {
        let mut seen = Vec::new();
        let mut sink = |d: &Diagnostic| seen.push(d.clone());
        let layout = validate_vertex_layout(elements, &mut Some(&mut sink));
        (layout, seen)
    }

    #[test]
    fn packed_layout_has_no_warnings() {
        let (layout, diags) = collect(&[
            VertexElement::new("POSITION", DataFormat::RGB32F, 0),
            VertexElement::new("TEXCOORD", DataFormat::RG32F, 12),
            VertexElement::new("NORMAL", DataFormat::RGB32F, 20),
        ]);
        let layout = layout.unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.attributes[2].location, 2);
        assert_eq!(layout.attributes[2].offset, 20);
    }

    #[test]
    fn empty_declaration_is_an_error() {
        let (layout, diags) = collect(&[]);
        assert!(layout.is_none());
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn mismatched_offset_warns_but_still_builds() {
        let (layout, diags) = collect(&[
            VertexElement::new("POSITION", DataFormat::RGB32F, 0),
            VertexElement::new("COLOR", DataFormat::RGBA8, 16),
        ]);
        assert_eq!(layout.unwrap().stride, 20);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn offset_past_u32_range_is_an_error() {
        let (layout, diags) = collect(&[VertexElement::new(
            "POSITION",
            DataFormat::RGBA32F,
            u32::MAX - 4,
        )]);
        assert!(layout.is_none());
        let last = diags.last().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert!(last.message.contains("overflows"), "{}", last.message);
    }

    #[test]
    fn duplicate_semantic_and_instance_step_warn() {
        let mut inst = VertexElement::new("POSITION", DataFormat::RG32F, 12);
        inst.step = VertexStep::PerInstance;
        let (_, diags) = collect(&[VertexElement::new("POSITION", DataFormat::RGB32F, 0), inst]);
        assert_eq!(diags.len(), 2);
    }
}
