//! Binary save/load of boundary model state.
//!
//! Layout (little-endian):
//!
//! ```text
//! u32                 N
//! u32 + N * 3 f32     rest positions
//! u32 + N * 3 f32     positions
//! u32 + N * 3 f32     velocities
//! u32 + N f32         volumes
//! f32                 reference density
//! u8                  strong coupling present
//!   [6 arrays, 2 x Vec3]   when present
//! u32                 number of stored extension fields
//!   [u8 kind + array] per field, in registry order
//! ```
//!
//! Descriptor metadata is not written. The receiving model must be sized and
//! have the same strong-coupling state and stored extension fields (same
//! order and kinds) as the one that was saved.

use std::io::{Read, Write};

use crate::boundary::BoundaryModel;
use crate::error::{BoundaryError, BoundaryResult};
use crate::fields::{FieldData, FieldKind, FieldLocation};
use crate::strong_coupling::StrongCoupling;
use crate::Vec3;

/// Sequential writer of untyped scalars and arrays.
pub trait BinaryWriter {
    /// Write one byte.
    fn write_u8(&mut self, value: u8) -> BoundaryResult<()>;
    /// Write an unsigned 32-bit integer.
    fn write_u32(&mut self, value: u32) -> BoundaryResult<()>;
    /// Write one real.
    fn write_f32(&mut self, value: f32) -> BoundaryResult<()>;

    /// Write three reals.
    fn write_vec3(&mut self, value: Vec3) -> BoundaryResult<()> {
        for c in value {
            self.write_f32(c)?;
        }
        Ok(())
    }

    /// Length-prefixed real array.
    fn write_reals(&mut self, values: &[f32]) -> BoundaryResult<()> {
        self.write_u32(length_prefix(values.len(), "array length")?)?;
        values.iter().try_for_each(|&v| self.write_f32(v))
    }

    /// Length-prefixed vector array.
    fn write_vec3s(&mut self, values: &[Vec3]) -> BoundaryResult<()> {
        self.write_u32(length_prefix(values.len(), "array length")?)?;
        values.iter().try_for_each(|&v| self.write_vec3(v))
    }

    /// Length-prefixed integer array.
    fn write_u32s(&mut self, values: &[u32]) -> BoundaryResult<()> {
        self.write_u32(length_prefix(values.len(), "array length")?)?;
        values.iter().try_for_each(|&v| self.write_u32(v))
    }
}

/// Sequential reader matching [`BinaryWriter`].
pub trait BinaryReader {
    /// Read one byte.
    fn read_u8(&mut self) -> BoundaryResult<u8>;
    /// Read an unsigned 32-bit integer.
    fn read_u32(&mut self) -> BoundaryResult<u32>;
    /// Read one real.
    fn read_f32(&mut self) -> BoundaryResult<f32>;

    /// Read three reals.
    fn read_vec3(&mut self) -> BoundaryResult<Vec3> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    /// Length-prefixed real array, which must hold exactly `expected` entries.
    fn read_reals(&mut self, expected: usize, section: &'static str) -> BoundaryResult<Vec<f32>> {
        read_len(self, expected, section)?;
        (0..expected).map(|_| self.read_f32()).collect()
    }

    /// Length-prefixed vector array, which must hold exactly `expected` entries.
    fn read_vec3s(&mut self, expected: usize, section: &'static str) -> BoundaryResult<Vec<Vec3>> {
        read_len(self, expected, section)?;
        (0..expected).map(|_| self.read_vec3()).collect()
    }

    /// Length-prefixed integer array, which must hold exactly `expected` entries.
    fn read_u32s(&mut self, expected: usize, section: &'static str) -> BoundaryResult<Vec<u32>> {
        read_len(self, expected, section)?;
        (0..expected).map(|_| self.read_u32()).collect()
    }
}

/// Count as written into a `u32` prefix. Counts that do not fit are a
/// [`BoundaryError::FormatMismatch`] for `section`.
pub fn length_prefix(len: usize, section: &'static str) -> BoundaryResult<u32> {
    u32::try_from(len).map_err(|_| BoundaryError::FormatMismatch {
        section,
        expected: u64::from(u32::MAX),
        found: len as u64,
    })
}

fn read_len<R: BinaryReader + ?Sized>(
    reader: &mut R,
    expected: usize,
    section: &'static str,
) -> BoundaryResult<()> {
    let found = reader.read_u32()? as usize;
    if found != expected {
        return Err(BoundaryError::FormatMismatch {
            section,
            expected: expected as u64,
            found: found as u64,
        });
    }
    Ok(())
}

/// [`BinaryWriter`] over any `std::io::Write`.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    inner: W,
}

impl<W: Write> StreamWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> BoundaryResult<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> BinaryWriter for StreamWriter<W> {
    fn write_u8(&mut self, value: u8) -> BoundaryResult<()> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> BoundaryResult<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_f32(&mut self, value: f32) -> BoundaryResult<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }
}

/// [`BinaryReader`] over any `std::io::Read`.
#[derive(Debug)]
pub struct StreamReader<R: Read> {
    inner: R,
}

impl<R: Read> StreamReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Return the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> BoundaryResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Read> BinaryReader for StreamReader<R> {
    fn read_u8(&mut self) -> BoundaryResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u32(&mut self) -> BoundaryResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_f32(&mut self) -> BoundaryResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }
}

fn write_field_data<W: BinaryWriter + ?Sized>(writer: &mut W, data: &FieldData) -> BoundaryResult<()> {
    writer.write_u8(data.kind() as u8)?;
    match data {
        FieldData::Scalar(v) => writer.write_reals(v),
        FieldData::Vector3(v) => writer.write_vec3s(v),
        FieldData::UInt(v) => writer.write_u32s(v),
    }
}

fn read_field_data<R: BinaryReader + ?Sized>(
    reader: &mut R,
    kind: FieldKind,
    n: usize,
) -> BoundaryResult<FieldData> {
    let tag = reader.read_u8()?;
    if tag != kind as u8 {
        return Err(BoundaryError::FormatMismatch {
            section: "extension field kind",
            expected: kind as u64,
            found: tag as u64,
        });
    }
    Ok(match kind {
        FieldKind::Scalar => FieldData::Scalar(reader.read_reals(n, "extension field")?),
        FieldKind::Vector3 => FieldData::Vector3(reader.read_vec3s(n, "extension field")?),
        FieldKind::UInt => FieldData::UInt(reader.read_u32s(n, "extension field")?),
    })
}

impl BoundaryModel {
    /// Arena slots written by persistence, in registry order.
    fn stored_extension_slots(&self) -> Vec<(usize, FieldKind)> {
        self.fields
            .iter()
            .filter(|f| f.store_data)
            .filter_map(|f| match f.location {
                FieldLocation::Extension(slot) => Some((slot, f.kind)),
                FieldLocation::Builtin(_) => None,
            })
            .collect()
    }

    /// Serialize the model in the fixed layout described in the module docs.
    pub fn save_state<W: BinaryWriter + ?Sized>(&self, writer: &mut W) -> BoundaryResult<()> {
        writer.write_u32(length_prefix(self.number_of_particles(), "particle count")?)?;
        writer.write_vec3s(&self.x0)?;
        writer.write_vec3s(&self.x)?;
        writer.write_vec3s(&self.v)?;
        writer.write_reals(&self.volume)?;
        writer.write_f32(self.reference_density)?;

        match &self.strong_coupling {
            None => writer.write_u8(0)?,
            Some(sc) => {
                writer.write_u8(1)?;
                writer.write_reals(&sc.density)?;
                writer.write_reals(&sc.pressure)?;
                writer.write_vec3s(&sc.v_s)?;
                writer.write_reals(&sc.s)?;
                writer.write_vec3s(&sc.v_rr)?;
                writer.write_reals(&sc.minus_rho_div_v_rr)?;
                writer.write_vec3(sc.v_rr_body)?;
                writer.write_vec3(sc.omega_rr_body)?;
            }
        }

        let stored = self.stored_extension_slots();
        writer.write_u32(length_prefix(stored.len(), "extension count")?)?;
        for (slot, _) in stored {
            if let Some(data) = &self.extensions[slot] {
                write_field_data(writer, data)?;
            }
        }
        Ok(())
    }

    /// Restore state written by [`BoundaryModel::save_state`].
    ///
    /// The model must already have the saved particle count. Everything is
    /// read and checked before any array is replaced, so a failed load
    /// leaves the model as it was. The model is unsorted afterwards.
    pub fn load_state<R: BinaryReader + ?Sized>(&mut self, reader: &mut R) -> BoundaryResult<()> {
        let n = self.number_of_particles();
        let stored_n = reader.read_u32()? as usize;
        if stored_n != n {
            return Err(BoundaryError::FormatMismatch {
                section: "particle count",
                expected: n as u64,
                found: stored_n as u64,
            });
        }

        let x0 = reader.read_vec3s(n, "rest positions")?;
        let x = reader.read_vec3s(n, "positions")?;
        let v = reader.read_vec3s(n, "velocities")?;
        let volume = reader.read_reals(n, "volumes")?;
        let reference_density = reader.read_f32()?;

        let has_sc = reader.read_u8()? != 0;
        if has_sc != self.strong_coupling.is_some() {
            return Err(BoundaryError::FormatMismatch {
                section: "strong coupling flag",
                expected: self.strong_coupling.is_some() as u64,
                found: has_sc as u64,
            });
        }
        let strong_coupling = if has_sc {
            Some(StrongCoupling {
                density: reader.read_reals(n, "density")?,
                pressure: reader.read_reals(n, "pressure")?,
                v_s: reader.read_vec3s(n, "v_s")?,
                s: reader.read_reals(n, "source term")?,
                v_rr: reader.read_vec3s(n, "v_rr")?,
                minus_rho_div_v_rr: reader.read_reals(n, "minus_rho_div_v_rr")?,
                v_rr_body: reader.read_vec3()?,
                omega_rr_body: reader.read_vec3()?,
            })
        } else {
            None
        };

        let stored = self.stored_extension_slots();
        let count = reader.read_u32()? as usize;
        if count != stored.len() {
            return Err(BoundaryError::FormatMismatch {
                section: "extension field count",
                expected: stored.len() as u64,
                found: count as u64,
            });
        }
        let mut extensions = Vec::with_capacity(count);
        for &(slot, kind) in &stored {
            extensions.push((slot, read_field_data(reader, kind, n)?));
        }

        self.x0 = x0;
        self.x = x;
        self.v = v;
        self.volume = volume;
        self.reference_density = reference_density;
        self.strong_coupling = strong_coupling;
        for (slot, data) in extensions {
            self.extensions[slot] = Some(data);
        }
        self.sorted = false;

        tracing::info!("Boundary model state loaded: {} particles", n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn stream_scalars_are_little_endian() {
        let mut w = StreamWriter::new(Vec::new());
        w.write_u32(0x0102_0304).unwrap();
        w.write_f32(1.0).unwrap();
        let bytes = w.into_inner().unwrap();
        assert_eq!(&bytes[..4], &[4, 3, 2, 1]);
        assert_eq!(&bytes[4..], &1.0f32.to_le_bytes());
    }

    #[test]
    fn length_prefix_fits_u32() {
        assert_eq!(length_prefix(7, "test").unwrap(), 7);
        assert_eq!(length_prefix(u32::MAX as usize, "test").unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_count_is_rejected() {
        let err = length_prefix(u32::MAX as usize + 1, "particle count").unwrap_err();
        assert!(matches!(
            err,
            BoundaryError::FormatMismatch {
                section: "particle count",
                expected: 4_294_967_295,
                found: 4_294_967_296,
            }
        ));
    }

    #[test]
    fn array_length_is_checked() {
        let mut w = StreamWriter::new(Vec::new());
        w.write_reals(&[1.0, 2.0]).unwrap();
        let mut r = StreamReader::new(Cursor::new(w.into_inner().unwrap()));
        let err = r.read_reals(3, "volumes").unwrap_err();
        assert!(matches!(
            err,
            BoundaryError::FormatMismatch { section: "volumes", expected: 3, found: 2 }
        ));
    }

    #[test]
    fn truncated_stream_is_io_error() {
        let mut r = StreamReader::new(Cursor::new(vec![1u8, 2]));
        assert!(matches!(r.read_u32(), Err(BoundaryError::Io(_))));
    }

    #[test]
    fn empty_model_round_trips() {
        let model = BoundaryModel::new();
        let mut w = StreamWriter::new(Vec::new());
        model.save_state(&mut w).unwrap();
        let mut other = BoundaryModel::new();
        let mut r = StreamReader::new(Cursor::new(w.into_inner().unwrap()));
        other.load_state(&mut r).unwrap();
        assert_eq!(other.number_of_particles(), 0);
    }
}
