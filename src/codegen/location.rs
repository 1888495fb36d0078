// src/codegen/location.rs

/// Memory segment a location lives in: the current activation record
/// (FP-relative) or global data (GP-relative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    FpRelative,
    GpRelative,
}

/// A run-time value location: `segment_register + offset`, or, when `base`
/// is present, `*(base + offset)`. Base-tagged locations are produced only
/// by field-access code generation; the store/load lowering distinguishes
/// them from array-element references.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    pub segment: Segment,
    pub offset: i32,
    pub base: Option<Box<Location>>,
}

impl Location {
    pub fn new(segment: Segment, offset: i32, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segment,
            offset,
            base: None,
        }
    }

    pub fn with_base(segment: Segment, offset: i32, name: impl Into<String>, base: Location) -> Self {
        Self {
            name: name.into(),
            segment,
            offset,
            base: Some(Box::new(base)),
        }
    }

    /// The canonical receiver location: `+4(fp)`, named "this".
    pub fn this() -> Self {
        Location::new(Segment::FpRelative, 4, "this")
    }
}

// Value identity is (name, segment, offset); the base pointer is a
// code-generation artifact, not part of what the location denotes.
impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.segment == other.segment && self.offset == other.offset
    }
}
