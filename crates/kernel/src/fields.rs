//! Generic per-particle field registry.
//!
//! A [`FieldDescription`] names an array owned by a boundary model without
//! borrowing it. Tooling (persistence, exporters, debuggers) walks the
//! registry in insertion order and resolves each descriptor through the
//! model, so new per-particle quantities can be added at runtime without the
//! tooling knowing about them at compile time.

use crate::error::{BoundaryError, BoundaryResult};
use crate::Vec3;

/// Element type of a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldKind {
    /// One real per particle.
    Scalar = 0,
    /// Three reals per particle.
    Vector3 = 1,
    /// One unsigned integer per particle.
    UInt = 2,
}

impl FieldKind {
    /// Decode the tag written by persistence.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Scalar),
            1 => Some(Self::Vector3),
            2 => Some(Self::UInt),
            _ => None,
        }
    }
}

/// Arrays the boundary model owns directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinField {
    /// Rest position `x0`.
    RestPosition,
    /// Current position `x`.
    Position,
    /// Current velocity `v`.
    Velocity,
    /// Artificial volume `V`.
    Volume,
    /// Strong coupling: density.
    Density,
    /// Strong coupling: pressure.
    Pressure,
    /// Strong coupling: predicted velocity `v_s`.
    PredictedVelocity,
    /// Strong coupling: source term `s`.
    SourceTerm,
    /// Strong coupling: relative velocity response `v_rr`.
    RelativeVelocityResponse,
    /// Strong coupling: `-rho * div(v_rr)`.
    NegDensityDivergenceRhs,
}

impl BuiltinField {
    /// Element kind of the built-in array.
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Volume
            | Self::Density
            | Self::Pressure
            | Self::SourceTerm
            | Self::NegDensityDivergenceRhs => FieldKind::Scalar,
            Self::RestPosition
            | Self::Position
            | Self::Velocity
            | Self::PredictedVelocity
            | Self::RelativeVelocityResponse => FieldKind::Vector3,
        }
    }

    /// Whether the array belongs to the optional strong-coupling state.
    pub fn is_strong_coupling(self) -> bool {
        !matches!(
            self,
            Self::RestPosition | Self::Position | Self::Velocity | Self::Volume
        )
    }
}

/// Where the data behind a descriptor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLocation {
    /// One of the model's own arrays.
    Builtin(BuiltinField),
    /// Slot in the model's extension arena.
    Extension(usize),
}

/// Named, typed handle to a per-particle array.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescription {
    /// Unique name inside one registry.
    pub name: String,
    /// Element type.
    pub kind: FieldKind,
    /// Backing array.
    pub location: FieldLocation,
    /// Whether persistence writes this field.
    pub store_data: bool,
}

impl FieldDescription {
    /// Descriptor for a model-owned array.
    pub fn builtin(name: impl Into<String>, field: BuiltinField) -> Self {
        Self {
            name: name.into(),
            kind: field.kind(),
            location: FieldLocation::Builtin(field),
            store_data: false,
        }
    }

    /// Descriptor for an arena slot.
    pub fn extension(name: impl Into<String>, kind: FieldKind, slot: usize, store_data: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            location: FieldLocation::Extension(slot),
            store_data,
        }
    }
}

/// Insertion-ordered list of field descriptors with unique names.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FieldDescription>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor. Fails if the name is already taken.
    pub fn add_field(&mut self, field: FieldDescription) -> BoundaryResult<()> {
        if self.contains(&field.name) {
            return Err(BoundaryError::DuplicateField(field.name));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Look up a descriptor by name.
    pub fn field(&self, name: &str) -> BoundaryResult<&FieldDescription> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| BoundaryError::FieldNotFound(name.to_string()))
    }

    /// Descriptor at ordinal position `index`.
    ///
    /// Panics if `index >= number_of_fields()`; use [`FieldRegistry::get`]
    /// when the index is not known to be valid.
    #[inline]
    pub fn field_at(&self, index: usize) -> &FieldDescription {
        &self.fields[index]
    }

    /// Checked ordinal access.
    pub fn get(&self, index: usize) -> Option<&FieldDescription> {
        self.fields.get(index)
    }

    /// Remove a descriptor by name and hand it back.
    ///
    /// Removing a name that is not registered is a no-op and returns `None`.
    pub fn remove_field_by_name(&mut self, name: &str) -> Option<FieldDescription> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos))
    }

    /// Keep only the descriptors for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&FieldDescription) -> bool) {
        self.fields.retain(keep);
    }

    /// Number of registered descriptors.
    pub fn number_of_fields(&self) -> usize {
        self.fields.len()
    }

    /// Whether a descriptor with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescription> {
        self.fields.iter()
    }
}

/// Owned storage for an extension field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    /// Scalar array.
    Scalar(Vec<f32>),
    /// Vector array.
    Vector3(Vec<Vec3>),
    /// Unsigned integer array.
    UInt(Vec<u32>),
}

impl FieldData {
    /// Zero-filled array of `len` entries.
    pub fn zeros(kind: FieldKind, len: usize) -> Self {
        match kind {
            FieldKind::Scalar => Self::Scalar(vec![0.0; len]),
            FieldKind::Vector3 => Self::Vector3(vec![[0.0; 3]; len]),
            FieldKind::UInt => Self::UInt(vec![0; len]),
        }
    }

    /// Element kind.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Scalar(_) => FieldKind::Scalar,
            Self::Vector3(_) => FieldKind::Vector3,
            Self::UInt(_) => FieldKind::UInt,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(v) => v.len(),
            Self::Vector3(v) => v.len(),
            Self::UInt(v) => v.len(),
        }
    }

    /// Return `true` if the array has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow or shrink, keeping the common prefix and zero-filling new slots.
    pub fn resize(&mut self, len: usize) {
        match self {
            Self::Scalar(v) => v.resize(len, 0.0),
            Self::Vector3(v) => v.resize(len, [0.0; 3]),
            Self::UInt(v) => v.resize(len, 0),
        }
    }

    /// Borrow as a typed slice.
    pub fn as_slice(&self) -> FieldSlice<'_> {
        match self {
            Self::Scalar(v) => FieldSlice::Scalar(v),
            Self::Vector3(v) => FieldSlice::Vector3(v),
            Self::UInt(v) => FieldSlice::UInt(v),
        }
    }

    /// Borrow as a mutable typed slice.
    pub fn as_slice_mut(&mut self) -> FieldSliceMut<'_> {
        match self {
            Self::Scalar(v) => FieldSliceMut::Scalar(v),
            Self::Vector3(v) => FieldSliceMut::Vector3(v),
            Self::UInt(v) => FieldSliceMut::UInt(v),
        }
    }
}

/// Single entry of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Scalar entry.
    Scalar(f32),
    /// Vector entry.
    Vector3(Vec3),
    /// Integer entry.
    UInt(u32),
}

/// Read-only view of a field's array.
#[derive(Debug, Clone, Copy)]
pub enum FieldSlice<'a> {
    /// Scalar array.
    Scalar(&'a [f32]),
    /// Vector array.
    Vector3(&'a [Vec3]),
    /// Unsigned integer array.
    UInt(&'a [u32]),
}

impl<'a> FieldSlice<'a> {
    /// Element kind.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Scalar(_) => FieldKind::Scalar,
            Self::Vector3(_) => FieldKind::Vector3,
            Self::UInt(_) => FieldKind::UInt,
        }
    }

    /// Number of particles covered.
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(v) => v.len(),
            Self::Vector3(v) => v.len(),
            Self::UInt(v) => v.len(),
        }
    }

    /// Return `true` if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<FieldValue> {
        match self {
            Self::Scalar(v) => v.get(i).copied().map(FieldValue::Scalar),
            Self::Vector3(v) => v.get(i).copied().map(FieldValue::Vector3),
            Self::UInt(v) => v.get(i).copied().map(FieldValue::UInt),
        }
    }

    /// Flat real view: scalars as-is, vectors as `3 * len` reals.
    /// Integer fields have no real view.
    pub fn as_reals(&self) -> Option<&'a [f32]> {
        match *self {
            Self::Scalar(v) => Some(v),
            Self::Vector3(v) => Some(bytemuck::cast_slice(v)),
            Self::UInt(_) => None,
        }
    }
}

/// Mutable view of a field's array.
#[derive(Debug)]
pub enum FieldSliceMut<'a> {
    /// Scalar array.
    Scalar(&'a mut [f32]),
    /// Vector array.
    Vector3(&'a mut [Vec3]),
    /// Unsigned integer array.
    UInt(&'a mut [u32]),
}

impl FieldSliceMut<'_> {
    /// Element kind.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Scalar(_) => FieldKind::Scalar,
            Self::Vector3(_) => FieldKind::Vector3,
            Self::UInt(_) => FieldKind::UInt,
        }
    }

    /// Overwrite entry `i`. The value kind must match the field kind.
    pub fn set(&mut self, i: usize, value: FieldValue) -> bool {
        match (self, value) {
            (Self::Scalar(v), FieldValue::Scalar(x)) => v.get_mut(i).map(|e| *e = x).is_some(),
            (Self::Vector3(v), FieldValue::Vector3(x)) => v.get_mut(i).map(|e| *e = x).is_some(),
            (Self::UInt(v), FieldValue::UInt(x)) => v.get_mut(i).map(|e| *e = x).is_some(),
            _ => false,
        }
    }

    /// Flat mutable real view, see [`FieldSlice::as_reals`].
    pub fn as_reals_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            Self::Scalar(v) => Some(&mut **v),
            Self::Vector3(v) => Some(bytemuck::cast_slice_mut(&mut **v)),
            Self::UInt(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_lookup_preserves_order() {
        let mut reg = FieldRegistry::new();
        reg.add_field(FieldDescription::builtin("position", BuiltinField::Position)).unwrap();
        reg.add_field(FieldDescription::builtin("volume", BuiltinField::Volume)).unwrap();
        assert_eq!(reg.number_of_fields(), 2);
        assert_eq!(reg.field_at(0).name, "position");
        assert_eq!(reg.field_at(1).kind, FieldKind::Scalar);
        assert_eq!(reg.field("volume").unwrap().location, FieldLocation::Builtin(BuiltinField::Volume));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut reg = FieldRegistry::new();
        reg.add_field(FieldDescription::extension("x", FieldKind::Scalar, 0, false)).unwrap();
        let err = reg
            .add_field(FieldDescription::extension("x", FieldKind::Vector3, 1, true))
            .unwrap_err();
        assert!(matches!(err, BoundaryError::DuplicateField(ref n) if n == "x"));
        // The original descriptor is untouched
        assert_eq!(reg.number_of_fields(), 1);
        assert_eq!(reg.field("x").unwrap().kind, FieldKind::Scalar);
    }

    #[test]
    fn missing_name_is_not_found() {
        let reg = FieldRegistry::new();
        assert!(matches!(reg.field("missing"), Err(BoundaryError::FieldNotFound(_))));
        assert!(reg.get(0).is_none());
    }

    #[test]
    fn remove_by_name() {
        let mut reg = FieldRegistry::new();
        reg.add_field(FieldDescription::builtin("a", BuiltinField::Velocity)).unwrap();
        reg.add_field(FieldDescription::builtin("b", BuiltinField::Volume)).unwrap();
        let removed = reg.remove_field_by_name("a").unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(reg.number_of_fields(), 1);
        assert_eq!(reg.field_at(0).name, "b");
        assert!(reg.remove_field_by_name("a").is_none());
    }

    #[test]
    fn retain_filters_in_place() {
        let mut reg = FieldRegistry::new();
        reg.add_field(FieldDescription::builtin("p", BuiltinField::Pressure)).unwrap();
        reg.add_field(FieldDescription::builtin("v", BuiltinField::Volume)).unwrap();
        reg.add_field(FieldDescription::builtin("rho", BuiltinField::Density)).unwrap();
        reg.retain(|f| match f.location {
            FieldLocation::Builtin(b) => !b.is_strong_coupling(),
            FieldLocation::Extension(_) => true,
        });
        assert_eq!(reg.number_of_fields(), 1);
        assert!(reg.contains("v"));
    }

    #[test]
    fn vector_view_flattens_to_reals() {
        let data = FieldData::Vector3(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let reals = data.as_slice().as_reals().unwrap();
        assert_eq!(reals, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(FieldData::zeros(FieldKind::UInt, 3).as_slice().as_reals().is_none());
    }

    #[test]
    fn resize_keeps_prefix() {
        let mut data = FieldData::Scalar(vec![1.0, 2.0, 3.0]);
        data.resize(5);
        assert_eq!(data, FieldData::Scalar(vec![1.0, 2.0, 3.0, 0.0, 0.0]));
        data.resize(1);
        assert_eq!(data, FieldData::Scalar(vec![1.0]));
    }

    #[test]
    fn set_rejects_kind_mismatch() {
        let mut data = FieldData::zeros(FieldKind::Scalar, 2);
        let mut view = data.as_slice_mut();
        assert!(view.set(1, FieldValue::Scalar(4.0)));
        assert!(!view.set(0, FieldValue::UInt(4)));
        assert!(!view.set(2, FieldValue::Scalar(1.0)));
        assert_eq!(data.as_slice().get(1), Some(FieldValue::Scalar(4.0)));
    }
}
