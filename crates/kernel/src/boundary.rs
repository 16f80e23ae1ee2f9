//! Boundary particle store for Akinci et al. (2012) rigid-fluid coupling.
//!
//! A [`BoundaryModel`] holds the surface samples of one rigid body as
//! parallel arrays indexed by a dense particle id in `[0, N)`: rest position,
//! current position, velocity and artificial volume, optional strong-coupling
//! state (Gissler et al. 2019) and any number of extension arrays registered
//! through the field registry.
//!
//! All arrays always have the same length. Nothing outside the model may hold
//! a reference into them across a resort.

use std::sync::{Arc, Weak};

use crate::error::{BoundaryError, BoundaryResult};
use crate::fields::{
    BuiltinField, FieldData, FieldDescription, FieldKind, FieldLocation, FieldRegistry,
    FieldSlice, FieldSliceMut, FieldValue,
};
use crate::math::{add, cross, mat_vec, sub};
use crate::neighbor::{NeighborhoodSearch, PointSetId};
use crate::rigid_body::RigidBodyObject;
use crate::strong_coupling::StrongCoupling;
use crate::Vec3;

/// Built-in descriptors registered by every model.
const BASE_FIELDS: [(&str, BuiltinField); 4] = [
    ("position0", BuiltinField::RestPosition),
    ("position", BuiltinField::Position),
    ("velocity", BuiltinField::Velocity),
    ("volume", BuiltinField::Volume),
];

/// Descriptors that exist while strong coupling is enabled.
const STRONG_COUPLING_FIELDS: [(&str, BuiltinField); 6] = [
    ("density", BuiltinField::Density),
    ("pressure", BuiltinField::Pressure),
    ("v_s", BuiltinField::PredictedVelocity),
    ("source_term", BuiltinField::SourceTerm),
    ("v_rr", BuiltinField::RelativeVelocityResponse),
    ("minus_rho_div_v_rr", BuiltinField::NegDensityDivergenceRhs),
];

/// Boundary particles of one rigid body.
#[derive(Debug, Clone)]
pub struct BoundaryModel {
    pub(crate) x0: Vec<Vec3>,
    pub(crate) x: Vec<Vec3>,
    pub(crate) v: Vec<Vec3>,
    pub(crate) volume: Vec<f32>,
    pub(crate) strong_coupling: Option<StrongCoupling>,
    /// Extension arena. Slots are never reused while a descriptor points at them.
    pub(crate) extensions: Vec<Option<FieldData>>,
    pub(crate) fields: FieldRegistry,
    pub(crate) reference_density: f32,
    rigid_body: Option<Weak<dyn RigidBodyObject>>,
    pub(crate) point_set: Option<PointSetId>,
    pub(crate) sorted: bool,
    /// Epoch of the last permutation applied, kept across resets.
    pub(crate) applied_epoch: Option<u64>,
}

impl BoundaryModel {
    /// Create an empty model with the built-in fields registered.
    pub fn new() -> Self {
        let mut fields = FieldRegistry::new();
        for (name, field) in BASE_FIELDS {
            let mut desc = FieldDescription::builtin(name, field);
            desc.store_data = true;
            let added = fields.add_field(desc);
            debug_assert!(added.is_ok(), "built-in field names are distinct");
        }
        Self {
            x0: Vec::new(),
            x: Vec::new(),
            v: Vec::new(),
            volume: Vec::new(),
            strong_coupling: None,
            extensions: Vec::new(),
            fields,
            reference_density: 1.0,
            rigid_body: None,
            point_set: None,
            sorted: false,
            applied_epoch: None,
        }
    }

    /// Populate the model from the boundary samples of `rigid_body`.
    ///
    /// Positions are copied into both the rest and current arrays; velocity,
    /// volume and strong-coupling state start at zero. The model registers a
    /// point set with `search` (or resizes the one it already owns) and keeps
    /// a non-owning reference to the body.
    pub fn init_model<S>(
        &mut self,
        rigid_body: &Arc<dyn RigidBodyObject>,
        positions: &[Vec3],
        search: &mut S,
    ) -> BoundaryResult<()>
    where
        S: NeighborhoodSearch + ?Sized,
    {
        if let Some(index) = positions.iter().position(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(BoundaryError::NonFinitePosition { index });
        }

        let n = positions.len();
        self.resize(n);
        self.x0.copy_from_slice(positions);
        self.x.copy_from_slice(positions);
        self.v.fill([0.0; 3]);
        self.volume.fill(0.0);
        if let Some(sc) = self.strong_coupling.as_mut() {
            sc.clear();
        }
        for data in self.extensions.iter_mut().flatten() {
            *data = FieldData::zeros(data.kind(), n);
        }

        self.rigid_body = Some(Arc::downgrade(rigid_body));
        let set = match self.point_set {
            Some(set) => {
                search.resize_point_set(set, n);
                set
            }
            None => search.add_point_set(n),
        };
        self.point_set = Some(set);

        tracing::info!(
            "Boundary model initialized: {} particles, point set {}",
            n,
            set.0
        );
        Ok(())
    }

    /// Grow or shrink every owned array to `n` entries.
    ///
    /// The first `min(N, n)` entries are kept; new entries are zero.
    pub fn resize(&mut self, n: usize) {
        self.x0.resize(n, [0.0; 3]);
        self.x.resize(n, [0.0; 3]);
        self.v.resize(n, [0.0; 3]);
        self.volume.resize(n, 0.0);
        if let Some(sc) = self.strong_coupling.as_mut() {
            sc.resize(n);
        }
        for data in self.extensions.iter_mut().flatten() {
            data.resize(n);
        }
        self.sorted = false;
        tracing::debug!("Boundary model resized to {} particles", n);
    }

    /// Clear per-step state: velocities, volumes and strong-coupling values.
    ///
    /// Rest and current positions are kept; re-deriving them from the body
    /// pose is the caller's job (see [`BoundaryModel::update_from_rigid_body`]).
    pub fn reset(&mut self) {
        self.sorted = false;
        self.v.fill([0.0; 3]);
        self.volume.fill(0.0);
        if let Some(sc) = self.strong_coupling.as_mut() {
            sc.clear();
        }
    }

    /// Number of boundary particles N.
    pub fn number_of_particles(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if the model holds no particles.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Point set registered with the neighborhood search, once initialized.
    pub fn point_set_id(&self) -> Option<PointSetId> {
        self.point_set
    }

    /// Whether the arrays currently follow the last applied permutation.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Epoch of the last permutation applied to this model.
    pub fn applied_sort_epoch(&self) -> Option<u64> {
        self.applied_epoch
    }

    /// Rigid body this model was sampled from, if it is still alive.
    pub fn rigid_body(&self) -> Option<Arc<dyn RigidBodyObject>> {
        self.rigid_body.as_ref().and_then(Weak::upgrade)
    }

    /// Density used to turn kernel sums into volumes.
    pub fn reference_density(&self) -> f32 {
        self.reference_density
    }

    /// Set the density used by the volume estimator.
    pub fn set_reference_density(&mut self, value: f32) {
        self.reference_density = value;
    }

    // ---- Per-particle accessors ----

    /// Rest position `x0` of particle `i`.
    #[inline]
    pub fn rest_position(&self, i: usize) -> Vec3 {
        debug_assert!(i < self.x0.len(), "boundary index {i} out of range");
        self.x0[i]
    }

    /// Overwrite the rest position of particle `i`.
    #[inline]
    pub fn set_rest_position(&mut self, i: usize, p: Vec3) {
        debug_assert!(i < self.x0.len(), "boundary index {i} out of range");
        self.x0[i] = p;
    }

    /// Current position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        debug_assert!(i < self.x.len(), "boundary index {i} out of range");
        self.x[i]
    }

    /// Mutable current position of particle `i`.
    #[inline]
    pub fn position_mut(&mut self, i: usize) -> &mut Vec3 {
        debug_assert!(i < self.x.len(), "boundary index {i} out of range");
        &mut self.x[i]
    }

    /// Overwrite the current position of particle `i`.
    #[inline]
    pub fn set_position(&mut self, i: usize, p: Vec3) {
        debug_assert!(i < self.x.len(), "boundary index {i} out of range");
        self.x[i] = p;
    }

    /// Current velocity of particle `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> Vec3 {
        debug_assert!(i < self.v.len(), "boundary index {i} out of range");
        self.v[i]
    }

    /// Mutable velocity of particle `i`.
    #[inline]
    pub fn velocity_mut(&mut self, i: usize) -> &mut Vec3 {
        debug_assert!(i < self.v.len(), "boundary index {i} out of range");
        &mut self.v[i]
    }

    /// Overwrite the velocity of particle `i`.
    #[inline]
    pub fn set_velocity(&mut self, i: usize, vel: Vec3) {
        debug_assert!(i < self.v.len(), "boundary index {i} out of range");
        self.v[i] = vel;
    }

    /// Artificial volume of particle `i`.
    #[inline]
    pub fn volume(&self, i: usize) -> f32 {
        debug_assert!(i < self.volume.len(), "boundary index {i} out of range");
        self.volume[i]
    }

    /// Overwrite the volume of particle `i`.
    #[inline]
    pub fn set_volume(&mut self, i: usize, value: f32) {
        debug_assert!(i < self.volume.len(), "boundary index {i} out of range");
        self.volume[i] = value;
    }

    /// All rest positions.
    pub fn rest_positions(&self) -> &[Vec3] {
        &self.x0
    }

    /// All current positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.x
    }

    /// All velocities.
    pub fn velocities(&self) -> &[Vec3] {
        &self.v
    }

    /// All volumes.
    pub fn volumes(&self) -> &[f32] {
        &self.volume
    }

    // ---- Strong coupling ----

    /// Allocate strong-coupling state and register its fields.
    /// Does nothing if already enabled.
    pub fn enable_strong_coupling(&mut self) {
        if self.strong_coupling.is_some() {
            return;
        }
        self.strong_coupling = Some(StrongCoupling::new(self.number_of_particles()));
        for (name, field) in STRONG_COUPLING_FIELDS {
            // An extension may already use the name; the built-in stays
            // reachable through the typed accessors either way.
            if let Err(e) = self.fields.add_field(FieldDescription::builtin(name, field)) {
                tracing::warn!("Strong coupling field not registered: {}", e);
            }
        }
    }

    /// Drop strong-coupling state and every descriptor that points at it,
    /// aliases included.
    pub fn disable_strong_coupling(&mut self) {
        if self.strong_coupling.take().is_none() {
            return;
        }
        self.fields.retain(|d| match d.location {
            FieldLocation::Builtin(field) => !field.is_strong_coupling(),
            FieldLocation::Extension(_) => true,
        });
    }

    /// Strong-coupling state, if enabled.
    pub fn strong_coupling(&self) -> Option<&StrongCoupling> {
        self.strong_coupling.as_ref()
    }

    /// Mutable strong-coupling state, if enabled.
    pub fn strong_coupling_mut(&mut self) -> Option<&mut StrongCoupling> {
        self.strong_coupling.as_mut()
    }

    // ---- Rigid body and neighborhood search ----

    /// Replay the rigid body pose onto the boundary samples.
    ///
    /// For dynamic or animated bodies:
    /// ```text
    /// x_i = R * x0_i + t
    /// v_i = v_body + omega x (x_i - t)
    /// ```
    /// Static bodies are left untouched. Returns whether positions changed.
    pub fn update_from_rigid_body(&mut self) -> BoundaryResult<bool> {
        let body = match &self.rigid_body {
            None => return Ok(false),
            Some(weak) => weak.upgrade().ok_or(BoundaryError::DetachedRigidBody)?,
        };
        if !body.is_dynamic() && !body.is_animated() {
            return Ok(false);
        }

        let rotation = body.rotation();
        let translation = body.position();
        let v_body = body.velocity();
        let omega = body.angular_velocity();

        for ((x, v), &x0) in self.x.iter_mut().zip(self.v.iter_mut()).zip(&self.x0) {
            *x = add(mat_vec(&rotation, x0), translation);
            *v = add(v_body, cross(omega, sub(*x, translation)));
        }
        Ok(true)
    }

    /// Push the current positions into the model's point set.
    pub fn update_neighborhood_search<S>(&self, search: &mut S) -> BoundaryResult<()>
    where
        S: NeighborhoodSearch + ?Sized,
    {
        let set = self.point_set.ok_or(BoundaryError::Unregistered)?;
        search.update_point_set(set, &self.x);
        Ok(())
    }

    // ---- Field registry ----

    /// Registered field descriptors.
    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    /// Number of registered fields.
    pub fn number_of_fields(&self) -> usize {
        self.fields.number_of_fields()
    }

    /// Field descriptor by name.
    pub fn field(&self, name: &str) -> BoundaryResult<&FieldDescription> {
        self.fields.field(name)
    }

    /// Field descriptor by ordinal position. Panics when out of range.
    pub fn field_at(&self, index: usize) -> &FieldDescription {
        self.fields.field_at(index)
    }

    /// Register a descriptor for an array the model already owns.
    ///
    /// The descriptor kind must match its location; extension descriptors
    /// must point at a live arena slot.
    pub fn add_field(&mut self, field: FieldDescription) -> BoundaryResult<()> {
        let actual = match field.location {
            FieldLocation::Builtin(b) => b.kind(),
            FieldLocation::Extension(slot) => self
                .extensions
                .get(slot)
                .and_then(Option::as_ref)
                .map(FieldData::kind)
                .ok_or_else(|| BoundaryError::FieldNotFound(field.name.clone()))?,
        };
        if actual != field.kind {
            return Err(BoundaryError::FieldKindMismatch {
                name: field.name,
                expected: field.kind,
                actual,
            });
        }
        self.fields.add_field(field)
    }

    /// Allocate a zeroed extension array of N entries and register it.
    ///
    /// Extension arrays are resized, reset on re-initialization and resorted
    /// together with the built-in arrays. Returns the arena slot.
    pub fn add_extension_field(
        &mut self,
        name: &str,
        kind: FieldKind,
        store_data: bool,
    ) -> BoundaryResult<usize> {
        if self.fields.contains(name) {
            return Err(BoundaryError::DuplicateField(name.to_string()));
        }
        let data = FieldData::zeros(kind, self.number_of_particles());
        let slot = match self.extensions.iter().position(Option::is_none) {
            Some(free) => {
                self.extensions[free] = Some(data);
                free
            }
            None => {
                self.extensions.push(Some(data));
                self.extensions.len() - 1
            }
        };
        self.fields
            .add_field(FieldDescription::extension(name, kind, slot, store_data))?;
        Ok(slot)
    }

    /// Remove a descriptor by name. Absent names are a no-op.
    ///
    /// An extension array is released once no descriptor refers to it.
    pub fn remove_field_by_name(&mut self, name: &str) -> Option<FieldDescription> {
        let removed = self.fields.remove_field_by_name(name)?;
        if let FieldLocation::Extension(slot) = removed.location {
            let still_used = self
                .fields
                .iter()
                .any(|f| f.location == FieldLocation::Extension(slot));
            if !still_used {
                self.extensions[slot] = None;
            }
        }
        Some(removed)
    }

    fn resolve(&self, location: FieldLocation) -> Option<FieldSlice<'_>> {
        let sc = self.strong_coupling.as_ref();
        Some(match location {
            FieldLocation::Builtin(b) => match b {
                BuiltinField::RestPosition => FieldSlice::Vector3(&self.x0),
                BuiltinField::Position => FieldSlice::Vector3(&self.x),
                BuiltinField::Velocity => FieldSlice::Vector3(&self.v),
                BuiltinField::Volume => FieldSlice::Scalar(&self.volume),
                BuiltinField::Density => FieldSlice::Scalar(&sc?.density),
                BuiltinField::Pressure => FieldSlice::Scalar(&sc?.pressure),
                BuiltinField::PredictedVelocity => FieldSlice::Vector3(&sc?.v_s),
                BuiltinField::SourceTerm => FieldSlice::Scalar(&sc?.s),
                BuiltinField::RelativeVelocityResponse => FieldSlice::Vector3(&sc?.v_rr),
                BuiltinField::NegDensityDivergenceRhs => {
                    FieldSlice::Scalar(&sc?.minus_rho_div_v_rr)
                }
            },
            FieldLocation::Extension(slot) => self.extensions.get(slot)?.as_ref()?.as_slice(),
        })
    }

    fn resolve_mut(&mut self, location: FieldLocation) -> Option<FieldSliceMut<'_>> {
        let sc = self.strong_coupling.as_mut();
        Some(match location {
            FieldLocation::Builtin(b) => match b {
                BuiltinField::RestPosition => FieldSliceMut::Vector3(&mut self.x0),
                BuiltinField::Position => FieldSliceMut::Vector3(&mut self.x),
                BuiltinField::Velocity => FieldSliceMut::Vector3(&mut self.v),
                BuiltinField::Volume => FieldSliceMut::Scalar(&mut self.volume),
                BuiltinField::Density => FieldSliceMut::Scalar(&mut sc?.density),
                BuiltinField::Pressure => FieldSliceMut::Scalar(&mut sc?.pressure),
                BuiltinField::PredictedVelocity => FieldSliceMut::Vector3(&mut sc?.v_s),
                BuiltinField::SourceTerm => FieldSliceMut::Scalar(&mut sc?.s),
                BuiltinField::RelativeVelocityResponse => FieldSliceMut::Vector3(&mut sc?.v_rr),
                BuiltinField::NegDensityDivergenceRhs => {
                    FieldSliceMut::Scalar(&mut sc?.minus_rho_div_v_rr)
                }
            },
            FieldLocation::Extension(slot) => {
                self.extensions.get_mut(slot)?.as_mut()?.as_slice_mut()
            }
        })
    }

    /// Read-only view of a registered field.
    pub fn field_view(&self, name: &str) -> BoundaryResult<FieldSlice<'_>> {
        let location = self.fields.field(name)?.location;
        self.resolve(location)
            .ok_or_else(|| BoundaryError::FieldNotFound(name.to_string()))
    }

    /// Mutable view of a registered field.
    pub fn field_view_mut(&mut self, name: &str) -> BoundaryResult<FieldSliceMut<'_>> {
        let location = self.fields.field(name)?.location;
        self.resolve_mut(location)
            .ok_or_else(|| BoundaryError::FieldNotFound(name.to_string()))
    }

    /// Checked read of entry `i` of a registered field.
    pub fn field_value(&self, name: &str, i: usize) -> BoundaryResult<FieldValue> {
        let view = self.field_view(name)?;
        view.get(i).ok_or(BoundaryError::IndexOutOfRange {
            index: i,
            len: view.len(),
        })
    }

    /// Checked write of entry `i` of a registered field.
    pub fn set_field_value(&mut self, name: &str, i: usize, value: FieldValue) -> BoundaryResult<()> {
        let mut view = self.field_view_mut(name)?;
        let kind = view.kind();
        let value_kind = match value {
            FieldValue::Scalar(_) => FieldKind::Scalar,
            FieldValue::Vector3(_) => FieldKind::Vector3,
            FieldValue::UInt(_) => FieldKind::UInt,
        };
        if kind != value_kind {
            return Err(BoundaryError::FieldKindMismatch {
                name: name.to_string(),
                expected: value_kind,
                actual: kind,
            });
        }
        if view.set(i, value) {
            Ok(())
        } else {
            Err(BoundaryError::IndexOutOfRange {
                index: i,
                len: self.number_of_particles(),
            })
        }
    }
}

impl Default for BoundaryModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::NeighborGrid;
    use crate::rigid_body::{RigidPose, SimpleRigidBody};

    fn line(n: usize) -> Vec<Vec3> {
        (0..n).map(|i| [i as f32 * 0.1, 0.0, 0.0]).collect()
    }

    fn init(n: usize) -> (BoundaryModel, NeighborGrid, Arc<dyn RigidBodyObject>) {
        let body: Arc<dyn RigidBodyObject> = Arc::new(SimpleRigidBody::fixed());
        let mut grid = NeighborGrid::new(0.2, [-1.0; 3], [2.0; 3]);
        let mut model = BoundaryModel::new();
        model.init_model(&body, &line(n), &mut grid).unwrap();
        (model, grid, body)
    }

    #[test]
    fn empty_model() {
        let model = BoundaryModel::new();
        assert_eq!(model.number_of_particles(), 0);
        assert!(model.is_empty());
        assert!(!model.is_sorted());
        assert!(model.point_set_id().is_none());
        assert_eq!(model.number_of_fields(), 4);
    }

    #[test]
    fn init_copies_positions_and_zeroes_state() {
        let (model, _grid, _body) = init(5);
        assert_eq!(model.number_of_particles(), 5);
        for i in 0..5 {
            assert_eq!(model.position(i), model.rest_position(i));
            assert_eq!(model.velocity(i), [0.0; 3]);
            assert_eq!(model.volume(i), 0.0);
        }
        assert_eq!(model.point_set_id(), Some(PointSetId(0)));
        assert!(model.rigid_body().is_some());
    }

    #[test]
    fn init_rejects_nan() {
        let body: Arc<dyn RigidBodyObject> = Arc::new(SimpleRigidBody::fixed());
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let mut model = BoundaryModel::new();
        let err = model
            .init_model(&body, &[[0.0; 3], [f32::NAN, 0.0, 0.0]], &mut grid)
            .unwrap_err();
        assert!(matches!(err, BoundaryError::NonFinitePosition { index: 1 }));
    }

    #[test]
    fn reinit_reuses_point_set() {
        let (mut model, mut grid, body) = init(3);
        model.init_model(&body, &line(7), &mut grid).unwrap();
        assert_eq!(model.point_set_id(), Some(PointSetId(0)));
        assert_eq!(grid.point_set_len(PointSetId(0)), 7);
    }

    #[test]
    fn reset_keeps_positions() {
        let (mut model, _grid, _body) = init(3);
        model.set_velocity(1, [1.0, 2.0, 3.0]);
        model.set_volume(2, 0.5);
        model.sorted = true;
        model.reset();
        assert!(!model.is_sorted());
        assert_eq!(model.velocity(1), [0.0; 3]);
        assert_eq!(model.volume(2), 0.0);
        assert_eq!(model.position(2), [0.2, 0.0, 0.0]);
        assert_eq!(model.rest_position(2), [0.2, 0.0, 0.0]);
    }

    #[test]
    fn strong_coupling_fields_follow_activation() {
        let (mut model, _grid, _body) = init(3);
        assert!(model.strong_coupling().is_none());
        assert!(model.field("pressure").is_err());

        model.enable_strong_coupling();
        assert_eq!(model.strong_coupling().unwrap().len(), 3);
        assert_eq!(model.number_of_fields(), 10);
        model.strong_coupling_mut().unwrap().set_pressure(2, 7.0);
        assert_eq!(model.field_value("pressure", 2).unwrap(), FieldValue::Scalar(7.0));

        model.resize(5);
        assert_eq!(model.strong_coupling().unwrap().len(), 5);

        model.disable_strong_coupling();
        assert!(model.strong_coupling().is_none());
        assert_eq!(model.number_of_fields(), 4);
    }

    #[test]
    fn extension_fields_track_particle_count() {
        let (mut model, _grid, _body) = init(3);
        let slot = model.add_extension_field("normal", FieldKind::Vector3, true).unwrap();
        assert_eq!(slot, 0);
        assert!(matches!(
            model.add_extension_field("normal", FieldKind::Scalar, false),
            Err(BoundaryError::DuplicateField(_))
        ));
        model
            .set_field_value("normal", 1, FieldValue::Vector3([0.0, 1.0, 0.0]))
            .unwrap();
        model.resize(6);
        assert_eq!(model.field_view("normal").unwrap().len(), 6);
        assert_eq!(
            model.field_value("normal", 1).unwrap(),
            FieldValue::Vector3([0.0, 1.0, 0.0])
        );

        assert!(model.remove_field_by_name("normal").is_some());
        assert!(model.extensions[slot].is_none());
        assert!(model.remove_field_by_name("normal").is_none());
    }

    #[test]
    fn checked_access_reports_out_of_range() {
        let (model, _grid, _body) = init(2);
        let err = model.field_value("volume", 2).unwrap_err();
        assert!(matches!(err, BoundaryError::IndexOutOfRange { index: 2, len: 2 }));
        assert!(matches!(
            model.field_value("missing", 0),
            Err(BoundaryError::FieldNotFound(_))
        ));
    }

    #[test]
    fn set_field_value_checks_kind() {
        let (mut model, _grid, _body) = init(2);
        let err = model
            .set_field_value("volume", 0, FieldValue::Vector3([1.0; 3]))
            .unwrap_err();
        assert!(matches!(err, BoundaryError::FieldKindMismatch { .. }));
    }

    #[test]
    fn add_field_validates_location() {
        let mut model = BoundaryModel::new();
        let alias = FieldDescription::builtin("x", BuiltinField::Position);
        model.add_field(alias.clone()).unwrap();
        assert!(matches!(model.add_field(alias), Err(BoundaryError::DuplicateField(_))));

        let dangling = FieldDescription::extension("ghost", FieldKind::Scalar, 3, false);
        assert!(matches!(model.add_field(dangling), Err(BoundaryError::FieldNotFound(_))));

        let mut wrong = FieldDescription::builtin("v2", BuiltinField::Velocity);
        wrong.kind = FieldKind::Scalar;
        assert!(matches!(
            model.add_field(wrong),
            Err(BoundaryError::FieldKindMismatch { .. })
        ));
    }

    #[test]
    fn rigid_replay_moves_dynamic_bodies_only() {
        let body = Arc::new(SimpleRigidBody::dynamic(RigidPose::default()));
        let dyn_body: Arc<dyn RigidBodyObject> = body.clone();
        let mut grid = NeighborGrid::new(0.2, [-1.0; 3], [2.0; 3]);
        let mut model = BoundaryModel::new();
        model.init_model(&dyn_body, &[[1.0, 0.0, 0.0]], &mut grid).unwrap();

        body.set_pose(RigidPose {
            position: [0.0, 0.0, 1.0],
            rotation: crate::math::axis_angle([0.0, 0.0, 1.0], std::f32::consts::FRAC_PI_2),
            velocity: [1.0, 0.0, 0.0],
            angular_velocity: [0.0, 0.0, 2.0],
        });
        assert!(model.update_from_rigid_body().unwrap());
        let x = model.position(0);
        assert!(x[0].abs() < 1e-6 && (x[1] - 1.0).abs() < 1e-6 && (x[2] - 1.0).abs() < 1e-6);
        // v = v_body + omega x (x - t) = (1,0,0) + (0,0,2) x (0,1,0) = (-1,0,0)
        let v = model.velocity(0);
        assert!((v[0] + 1.0).abs() < 1e-6 && v[1].abs() < 1e-6);
        assert_eq!(model.rest_position(0), [1.0, 0.0, 0.0]);

        drop(dyn_body);
        drop(body);
        assert!(matches!(
            model.update_from_rigid_body(),
            Err(BoundaryError::DetachedRigidBody)
        ));
    }

    #[test]
    fn rigid_replay_skips_static_bodies() {
        let (mut model, _grid, _body) = init(2);
        model.set_position(0, [5.0; 3]);
        assert!(!model.update_from_rigid_body().unwrap());
        assert_eq!(model.position(0), [5.0; 3]);
    }

    #[test]
    fn update_search_requires_registration() {
        let model = BoundaryModel::new();
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        assert!(matches!(
            model.update_neighborhood_search(&mut grid),
            Err(BoundaryError::Unregistered)
        ));
    }
}
