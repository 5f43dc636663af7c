// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! A very simple serialization framework which is used to persist learned liquidity knowledge
//! between process runs.

use core::cmp;
use core::fmt;
use core::hash::Hash;
use core::time::Duration;
use std::io::{self, Read, Write};

use crate::util::hash_tables::{hash_map_with_capacity, HashMap};

/// The upper bound on the number of entries we pre-allocate for when reading a length-prefixed
/// collection, so that a corrupt length cannot make us allocate unbounded memory up front.
const MAX_PREALLOC_ENTRIES: usize = 4096;

/// An error in decoding a message or struct.
#[derive(Debug)]
pub enum DecodeError {
	/// A version byte specified something we don't know how to handle.
	UnknownVersion,
	/// Value was invalid, eg a byte which was supposed to be a bool was something other than a 0
	/// or 1, a public key was invalid, etc.
	InvalidValue,
	/// The buffer to be read was too short.
	ShortRead,
	/// Error from [`std::io`].
	Io(io::ErrorKind),
}

impl From<io::Error> for DecodeError {
	fn from(e: io::Error) -> Self {
		if e.kind() == io::ErrorKind::UnexpectedEof {
			DecodeError::ShortRead
		} else {
			DecodeError::Io(e.kind())
		}
	}
}

impl PartialEq for DecodeError {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(DecodeError::UnknownVersion, DecodeError::UnknownVersion) => true,
			(DecodeError::InvalidValue, DecodeError::InvalidValue) => true,
			(DecodeError::ShortRead, DecodeError::ShortRead) => true,
			(DecodeError::Io(a), DecodeError::Io(b)) => a == b,
			_ => false,
		}
	}
}
impl Eq for DecodeError {}

impl fmt::Display for DecodeError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			DecodeError::UnknownVersion => f.write_str("Unknown serialization version"),
			DecodeError::InvalidValue => {
				f.write_str("Nonsense bytes didn't map to the type they were interpreted as")
			},
			DecodeError::ShortRead => f.write_str("Data extended beyond the provided bytes"),
			DecodeError::Io(ref e) => fmt::Debug::fmt(e, f),
		}
	}
}

impl std::error::Error for DecodeError {}

/// A trait that is similar to [`std::io::Write`] but has one extra function which can be used to
/// size buffers being written into.
///
/// An impl is provided for any type that also impls [`std::io::Write`] which simply ignores size
/// hints.
pub trait Writer {
	/// Writes the given buf out. See [`std::io::Write::write_all`] for more
	fn write_all(&mut self, buf: &[u8]) -> Result<(), io::Error>;
}

impl<W: Write> Writer for W {
	#[inline]
	fn write_all(&mut self, buf: &[u8]) -> Result<(), io::Error> {
		<Self as io::Write>::write_all(self, buf)
	}
}

pub(crate) struct VecWriter(pub Vec<u8>);
impl Writer for VecWriter {
	#[inline]
	fn write_all(&mut self, buf: &[u8]) -> Result<(), io::Error> {
		self.0.extend_from_slice(buf);
		Ok(())
	}
}

/// Writer that only tracks the amount of data written - useful if you need to calculate the length
/// of some data when serialized but don't yet need the full data.
pub(crate) struct LengthCalculatingWriter(pub usize);
impl Writer for LengthCalculatingWriter {
	#[inline]
	fn write_all(&mut self, buf: &[u8]) -> Result<(), io::Error> {
		self.0 += buf.len();
		Ok(())
	}
}

/// A trait that various types implement allowing them to be written out to a [`Writer`].
pub trait Writeable {
	/// Writes `self` out to the given [`Writer`].
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), io::Error>;

	/// Writes `self` out to a `Vec<u8>`.
	fn encode(&self) -> Vec<u8> {
		let mut msg = VecWriter(Vec::new());
		// Writing into a Vec cannot fail.
		let _ = self.write(&mut msg);
		msg.0
	}

	/// Gets the length of this object after it has been serialized. This can be overridden to
	/// optimize cases where we prepend an object with its length.
	fn serialized_length(&self) -> usize {
		let mut len_calc = LengthCalculatingWriter(0);
		let _ = self.write(&mut len_calc);
		len_calc.0
	}
}

impl<'a, T: Writeable> Writeable for &'a T {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), io::Error> {
		(*self).write(writer)
	}
}

/// A trait that various types implement allowing them to be read in from a [`Read`].
pub trait Readable
where
	Self: Sized,
{
	/// Reads a `Self` in from the given [`Read`].
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError>;
}

/// A trait that various higher-level types implement allowing them to be read in
/// from a [`Read`] given some additional set of arguments which is required to deserialize.
pub trait ReadableArgs<P>
where
	Self: Sized,
{
	/// Reads a `Self` in from the given [`Read`].
	fn read<R: Read>(reader: &mut R, params: P) -> Result<Self, DecodeError>;
}

macro_rules! impl_writeable_primitive {
	($val_type:ty, $len: expr) => {
		impl Writeable for $val_type {
			#[inline]
			fn write<W: Writer>(&self, writer: &mut W) -> Result<(), io::Error> {
				writer.write_all(&self.to_be_bytes())
			}
		}
		impl Readable for $val_type {
			#[inline]
			fn read<R: Read>(reader: &mut R) -> Result<$val_type, DecodeError> {
				let mut buf = [0; $len];
				reader.read_exact(&mut buf)?;
				Ok(<$val_type>::from_be_bytes(buf))
			}
		}
	};
}

impl_writeable_primitive!(u64, 8);
impl_writeable_primitive!(u32, 4);
impl_writeable_primitive!(u16, 2);

impl Writeable for u8 {
	#[inline]
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), io::Error> {
		writer.write_all(&[*self])
	}
}
impl Readable for u8 {
	#[inline]
	fn read<R: Read>(reader: &mut R) -> Result<u8, DecodeError> {
		let mut buf = [0; 1];
		reader.read_exact(&mut buf)?;
		Ok(buf[0])
	}
}

impl Writeable for bool {
	#[inline]
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), io::Error> {
		writer.write_all(&[if *self { 1 } else { 0 }])
	}
}
impl Readable for bool {
	#[inline]
	fn read<R: Read>(reader: &mut R) -> Result<bool, DecodeError> {
		let mut buf = [0; 1];
		reader.read_exact(&mut buf)?;
		if buf[0] != 0 && buf[0] != 1 {
			return Err(DecodeError::InvalidValue);
		}
		Ok(buf[0] == 1)
	}
}

impl Writeable for f64 {
	#[inline]
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), io::Error> {
		self.to_bits().write(writer)
	}
}
impl Readable for f64 {
	#[inline]
	fn read<R: Read>(reader: &mut R) -> Result<f64, DecodeError> {
		let bits: u64 = Readable::read(reader)?;
		let val = f64::from_bits(bits);
		if val.is_nan() {
			return Err(DecodeError::InvalidValue);
		}
		Ok(val)
	}
}

impl Writeable for Duration {
	#[inline]
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.as_secs().write(w)?;
		self.subsec_nanos().write(w)
	}
}
impl Readable for Duration {
	#[inline]
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let secs = Readable::read(r)?;
		let nanos: u32 = Readable::read(r)?;
		if nanos >= 1_000_000_000 {
			return Err(DecodeError::InvalidValue);
		}
		Ok(Duration::new(secs, nanos))
	}
}

macro_rules! impl_array {
	($size:expr) => {
		impl Writeable for [u8; $size] {
			#[inline]
			fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
				w.write_all(self)
			}
		}

		impl Readable for [u8; $size] {
			#[inline]
			fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
				let mut buf = [0u8; $size];
				r.read_exact(&mut buf)?;
				Ok(buf)
			}
		}
	};
}

impl_array!(32);
impl_array!(33);

impl<T: Writeable> Writeable for Option<T> {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		match *self {
			None => 0u8.write(w)?,
			Some(ref data) => {
				1u8.write(w)?;
				data.write(w)?;
			},
		}
		Ok(())
	}
}

impl<T: Readable> Readable for Option<T> {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		match <u8 as Readable>::read(r)? {
			0 => Ok(None),
			1 => Ok(Some(Readable::read(r)?)),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

impl<T: Writeable> Writeable for Vec<T> {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		(self.len() as u64).write(w)?;
		for item in self.iter() {
			item.write(w)?;
		}
		Ok(())
	}
}

impl<T: Readable> Readable for Vec<T> {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let len: u64 = Readable::read(r)?;
		let mut ret = Vec::with_capacity(cmp::min(len as usize, MAX_PREALLOC_ENTRIES));
		for _ in 0..len {
			ret.push(Readable::read(r)?);
		}
		Ok(ret)
	}
}

impl<K, V> Writeable for HashMap<K, V>
where
	K: Writeable + Eq + Hash + Ord,
	V: Writeable,
{
	/// Entries are written in key order so that equal maps always encode to equal bytes.
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		(self.len() as u64).write(w)?;
		let mut entries: Vec<(&K, &V)> = self.iter().collect();
		entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
		for (key, value) in entries {
			key.write(w)?;
			value.write(w)?;
		}
		Ok(())
	}
}

impl<K, V> Readable for HashMap<K, V>
where
	K: Readable + Eq + Hash,
	V: Readable,
{
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let len: u64 = Readable::read(r)?;
		let mut ret = hash_map_with_capacity(cmp::min(len as usize, MAX_PREALLOC_ENTRIES));
		for _ in 0..len {
			let k = K::read(r)?;
			let v = V::read(r)?;
			if ret.insert(k, v).is_some() {
				return Err(DecodeError::InvalidValue);
			}
		}
		Ok(ret)
	}
}
