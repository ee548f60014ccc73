//! Element formats and the accessor table that moves scalar values in and
//! out of raw bytes.
//!
//! Every element format a view can carry resolves to a [`FormatAccessor`]: a
//! buffer-protocol format string, the item size in bytes and a pair of
//! decode/encode function pointers. Lookup never fails. Formats the table has
//! no conversion for resolve to a sentinel accessor whose decode and encode
//! return [`StridedError::NotImplemented`], so a view's format can still be
//! inspected even when its data can't be read.
//!
//! Dispatch is a closed `match` over [`Component`] and channel count; the
//! pixel, vertex and scene-field enums only map their variants onto that pair.

use num_traits::NumCast;
use smallvec::SmallVec;

use crate::{Result, StridedError};

// ============================================================================
// Host values
// ============================================================================

/// A host-side element value.
///
/// Single-channel formats decode to a scalar variant, multi-channel formats to
/// [`Value::Ints`] or [`Value::Floats`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Ints(SmallVec<[i64; 4]>),
    Floats(SmallVec<[f64; 4]>),
}

impl Value {
    /// The value as `f64` if it is a numeric scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Bool(v) => Some(v as u8 as f64),
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    /// The value as `i64` if it is an integer scalar that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Bool(v) => Some(v as i64),
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Component values as floats, for scalars a single entry.
    pub fn to_floats(&self) -> SmallVec<[f64; 4]> {
        scalars(self).iter().map(|s| s.to_f64()).collect()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        Value::Floats(v.iter().copied().collect())
    }
}

impl<const N: usize> From<[i64; N]> for Value {
    fn from(v: [i64; N]) -> Self {
        Value::Ints(v.iter().copied().collect())
    }
}

#[derive(Debug, Clone, Copy)]
enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Scalar {
    fn to_f64(self) -> f64 {
        match self {
            Scalar::Int(v) => v as f64,
            Scalar::UInt(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }

    fn to_int<T: NumCast>(self) -> Result<T> {
        let cast = match self {
            Scalar::Int(v) => T::from(v),
            Scalar::UInt(v) => T::from(v),
            Scalar::Float(_) => return Err(StridedError::InvalidValue("expected an integer")),
        };
        cast.ok_or(StridedError::InvalidValue("integer out of range"))
    }
}

fn scalars(value: &Value) -> SmallVec<[Scalar; 4]> {
    match value {
        Value::Bool(v) => smallvec::smallvec![Scalar::Int(*v as i64)],
        Value::Int(v) => smallvec::smallvec![Scalar::Int(*v)],
        Value::UInt(v) => smallvec::smallvec![Scalar::UInt(*v)],
        Value::Float(v) => smallvec::smallvec![Scalar::Float(*v)],
        Value::Ints(v) => v.iter().map(|&x| Scalar::Int(x)).collect(),
        Value::Floats(v) => v.iter().map(|&x| Scalar::Float(x)).collect(),
    }
}

fn collect_value<const N: usize>(values: [Scalar; N]) -> Value {
    if N == 1 {
        return match values[0] {
            Scalar::Int(v) => Value::Int(v),
            Scalar::UInt(v) => Value::UInt(v),
            Scalar::Float(v) => Value::Float(v),
        };
    }
    if values.iter().any(|s| matches!(s, Scalar::Float(_))) {
        Value::Floats(values.iter().map(|s| s.to_f64()).collect())
    } else {
        Value::Ints(
            values
                .iter()
                .map(|s| match *s {
                    Scalar::Int(v) => v,
                    Scalar::UInt(v) => v as i64,
                    Scalar::Float(v) => v as i64,
                })
                .collect(),
        )
    }
}

// ============================================================================
// Channels
// ============================================================================

/// Storage and conversion of one channel of a format.
trait Channel {
    const SIZE: usize;

    fn read(bytes: &[u8]) -> Scalar;

    fn write(bytes: &mut [u8], value: Scalar) -> Result<()>;
}

#[inline]
fn load<T: bytemuck::Pod>(bytes: &[u8]) -> T {
    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<T>()])
}

#[inline]
fn store<T: bytemuck::Pod>(bytes: &mut [u8], value: T) {
    bytes[..std::mem::size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
}

macro_rules! int_channel {
    ($name:ident, $t:ty, $variant:ident) => {
        struct $name;

        impl Channel for $name {
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn read(bytes: &[u8]) -> Scalar {
                Scalar::$variant(load::<$t>(bytes) as _)
            }

            #[inline]
            fn write(bytes: &mut [u8], value: Scalar) -> Result<()> {
                store::<$t>(bytes, value.to_int::<$t>()?);
                Ok(())
            }
        }
    };
}

int_channel!(U8, u8, Int);
int_channel!(I8, i8, Int);
int_channel!(U16, u16, Int);
int_channel!(I16, i16, Int);
int_channel!(U32, u32, Int);
int_channel!(I32, i32, Int);
int_channel!(U64, u64, UInt);
int_channel!(I64, i64, Int);

struct F32;

impl Channel for F32 {
    const SIZE: usize = 4;

    fn read(bytes: &[u8]) -> Scalar {
        Scalar::Float(load::<f32>(bytes) as f64)
    }

    fn write(bytes: &mut [u8], value: Scalar) -> Result<()> {
        store::<f32>(bytes, value.to_f64() as f32);
        Ok(())
    }
}

struct F64;

impl Channel for F64 {
    const SIZE: usize = 8;

    fn read(bytes: &[u8]) -> Scalar {
        Scalar::Float(load::<f64>(bytes))
    }

    fn write(bytes: &mut [u8], value: Scalar) -> Result<()> {
        store::<f64>(bytes, value.to_f64());
        Ok(())
    }
}

/// Half floats have no host representation, they go through `f32`.
#[cfg(feature = "half")]
struct F16;

#[cfg(feature = "half")]
impl Channel for F16 {
    const SIZE: usize = 2;

    fn read(bytes: &[u8]) -> Scalar {
        Scalar::Float(half::f16::from_bits(load::<u16>(bytes)).to_f32() as f64)
    }

    fn write(bytes: &mut [u8], value: Scalar) -> Result<()> {
        store::<u16>(bytes, half::f16::from_f32(value.to_f64() as f32).to_bits());
        Ok(())
    }
}

macro_rules! normalized_channel {
    ($name:ident, $t:ty, $min:expr) => {
        struct $name;

        impl Channel for $name {
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn read(bytes: &[u8]) -> Scalar {
                Scalar::Float(unpack(load::<$t>(bytes) as f64, <$t>::MAX as f64, $min))
            }

            #[inline]
            fn write(bytes: &mut [u8], value: Scalar) -> Result<()> {
                store::<$t>(bytes, pack(value.to_f64(), <$t>::MAX as f64, $min) as $t);
                Ok(())
            }
        }
    };
}

/// `x / max`, clamped below at `min` so the most negative signed value maps
/// to `-1` like its neighbour.
#[inline]
fn unpack(x: f64, max: f64, min: f64) -> f64 {
    (x / max).max(min)
}

/// `round(x * max)` with `x` clamped to the representable `[min, 1]`.
#[inline]
fn pack(x: f64, max: f64, min: f64) -> f64 {
    (x.clamp(min, 1.0) * max).round()
}

normalized_channel!(Unorm8, u8, 0.0);
normalized_channel!(Snorm8, i8, -1.0);
normalized_channel!(Unorm16, u16, 0.0);
normalized_channel!(Snorm16, i16, -1.0);

/// sRGB-encoded 8-bit color channel, decoded to linear.
struct Srgb8;

impl Channel for Srgb8 {
    const SIZE: usize = 1;

    fn read(bytes: &[u8]) -> Scalar {
        Scalar::Float(srgb_to_linear(bytes[0] as f64 / 255.0))
    }

    fn write(bytes: &mut [u8], value: Scalar) -> Result<()> {
        bytes[0] = pack(linear_to_srgb(value.to_f64()), 255.0, 0.0) as u8;
        Ok(())
    }
}

/// The sRGB transfer function, encoded to linear.
pub fn srgb_to_linear(s: f64) -> f64 {
    if s <= 0.04045 {
        s / 12.92
    } else {
        ((s + 0.055) / 1.055).powf(2.4)
    }
}

/// The inverse sRGB transfer function, linear to encoded.
pub fn linear_to_srgb(l: f64) -> f64 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

fn check_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(StridedError::ItemSizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn decode_n<C: Channel, const N: usize>(bytes: &[u8]) -> Result<Value> {
    check_len(bytes, C::SIZE * N)?;
    let values: [Scalar; N] = std::array::from_fn(|i| C::read(&bytes[i * C::SIZE..]));
    Ok(collect_value(values))
}

fn encode_n<C: Channel, const N: usize>(bytes: &mut [u8], value: &Value) -> Result<()> {
    check_len(bytes, C::SIZE * N)?;
    let values = scalars(value);
    if values.len() != N {
        return Err(StridedError::ComponentCount {
            expected: N,
            actual: values.len(),
        });
    }
    for (i, v) in values.into_iter().enumerate() {
        C::write(&mut bytes[i * C::SIZE..], v)?;
    }
    Ok(())
}

/// Four-channel sRGB keeps alpha linear.
fn decode_srgb_alpha(bytes: &[u8]) -> Result<Value> {
    check_len(bytes, 4)?;
    let mut values: [Scalar; 4] = std::array::from_fn(|i| Srgb8::read(&bytes[i..]));
    values[3] = Unorm8::read(&bytes[3..]);
    Ok(collect_value(values))
}

fn encode_srgb_alpha(bytes: &mut [u8], value: &Value) -> Result<()> {
    check_len(bytes, 4)?;
    let values = scalars(value);
    if values.len() != 4 {
        return Err(StridedError::ComponentCount {
            expected: 4,
            actual: values.len(),
        });
    }
    for (i, v) in values[..3].iter().enumerate() {
        Srgb8::write(&mut bytes[i..], *v)?;
    }
    Unorm8::write(&mut bytes[3..], values[3])
}

/// Null format: every item is plain unsigned bytes.
fn decode_bytes(bytes: &[u8]) -> Result<Value> {
    Ok(match bytes {
        [b] => Value::Int(*b as i64),
        _ => Value::Ints(bytes.iter().map(|&b| b as i64).collect()),
    })
}

fn encode_bytes(bytes: &mut [u8], value: &Value) -> Result<()> {
    let values = scalars(value);
    if values.len() != bytes.len() {
        return Err(StridedError::ComponentCount {
            expected: bytes.len(),
            actual: values.len(),
        });
    }
    for (b, v) in bytes.iter_mut().zip(values) {
        *b = v.to_int::<u8>()?;
    }
    Ok(())
}

fn decode_unsupported(_: &[u8]) -> Result<Value> {
    Err(StridedError::NotImplemented("decoding this format is not implemented"))
}

fn encode_unsupported(_: &mut [u8], _: &Value) -> Result<()> {
    Err(StridedError::NotImplemented("encoding this format is not implemented"))
}

// ============================================================================
// Accessor record
// ============================================================================

/// Decodes one item's bytes into a host value.
pub type DecodeFn = fn(&[u8]) -> Result<Value>;

/// Encodes a host value into one item's bytes.
pub type EncodeFn = fn(&mut [u8], &Value) -> Result<()>;

/// Format string, item size and conversion functions for one element format.
#[derive(Clone, Copy)]
pub struct FormatAccessor {
    format: Option<&'static str>,
    item_size: usize,
    decode: DecodeFn,
    encode: EncodeFn,
    supported: bool,
}

impl std::fmt::Debug for FormatAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatAccessor")
            .field("format", &self.format)
            .field("item_size", &self.item_size)
            .field("supported", &self.supported)
            .finish()
    }
}

impl FormatAccessor {
    /// Plain bytes, the interpretation of a null format string.
    pub const BYTES: FormatAccessor = FormatAccessor::bytes(1);

    /// Plain bytes with `item_size` bytes per item. Items wider than one byte
    /// decode to [`Value::Ints`].
    pub const fn bytes(item_size: usize) -> Self {
        FormatAccessor {
            format: None,
            item_size,
            decode: decode_bytes,
            encode: encode_bytes,
            supported: true,
        }
    }

    /// Sentinel for formats without a conversion. Lookup succeeds, decode and
    /// encode fail.
    pub const fn unsupported(item_size: usize) -> Self {
        FormatAccessor {
            format: None,
            item_size,
            decode: decode_unsupported,
            encode: encode_unsupported,
            supported: false,
        }
    }

    fn channels<C: Channel, const N: usize>(format: &'static str) -> Self {
        FormatAccessor {
            format: Some(format),
            item_size: C::SIZE * N,
            decode: decode_n::<C, N>,
            encode: encode_n::<C, N>,
            supported: true,
        }
    }

    /// Buffer-protocol format string; `None` means plain unsigned bytes.
    #[inline]
    pub fn format(&self) -> Option<&'static str> {
        self.format
    }

    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    #[inline]
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    #[inline]
    pub fn decode_fn(&self) -> DecodeFn {
        self.decode
    }

    #[inline]
    pub fn encode_fn(&self) -> EncodeFn {
        self.encode
    }

    /// Decode one item. A slice shorter than [`Self::item_size`] fails with
    /// [`StridedError::ItemSizeMismatch`].
    #[inline]
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        check_len(bytes, self.item_size)?;
        (self.decode)(bytes)
    }

    /// Encode one item. A slice shorter than [`Self::item_size`] fails with
    /// [`StridedError::ItemSizeMismatch`].
    #[inline]
    pub fn encode(&self, bytes: &mut [u8], value: &Value) -> Result<()> {
        check_len(bytes, self.item_size)?;
        (self.encode)(bytes, value)
    }

    /// Resolve a buffer-protocol format string.
    ///
    /// Accepts an optional native or standard byte-order prefix, an optional
    /// repeat count of 1 to 4 and one of `bBhHiIlLqQefd`. Anything else is
    /// `None`.
    pub fn parse(format: &str) -> Option<Self> {
        let mut rest = format;
        if let Some(stripped) = rest.strip_prefix(['@', '=']) {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('<') {
            if cfg!(target_endian = "big") {
                return None;
            }
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix(['>', '!']) {
            if cfg!(target_endian = "little") {
                return None;
            }
            rest = stripped;
        }
        let mut chars = rest.chars();
        let (count, code) = match (chars.next()?, chars.next(), chars.next()) {
            (code, None, None) => (1, code),
            (digit @ '1'..='4', Some(code), None) => (digit as usize - '0' as usize, code),
            _ => return None,
        };
        let long_is_64 = std::mem::size_of::<std::ffi::c_long>() == 8;
        let component = match code {
            'b' => Component::I8,
            'B' => Component::U8,
            'h' => Component::I16,
            'H' => Component::U16,
            'i' => Component::I32,
            'I' => Component::U32,
            'l' if long_is_64 => Component::I64,
            'L' if long_is_64 => Component::U64,
            'l' => Component::I32,
            'L' => Component::U32,
            'q' => Component::I64,
            'Q' => Component::U64,
            'e' => Component::F16,
            'f' => Component::F32,
            'd' => Component::F64,
            _ => return None,
        };
        Some(component.accessor(count))
    }
}

// ============================================================================
// Components
// ============================================================================

/// Storage and interpretation of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F16,
    F32,
    F64,
    /// `u8` normalized to `[0, 1]`.
    U8Unorm,
    /// `i8` normalized to `[-1, 1]`.
    I8Snorm,
    U16Unorm,
    I16Snorm,
    /// sRGB-encoded `u8`, decoded to linear `[0, 1]`.
    U8Srgb,
}

macro_rules! counted {
    ($n:expr, $code:literal) => {
        match $n {
            1 => $code,
            2 => concat!("2", $code),
            3 => concat!("3", $code),
            _ => concat!("4", $code),
        }
    };
}

macro_rules! by_count {
    ($channel:ty, $n:expr, $format:expr) => {
        match $n {
            1 => FormatAccessor::channels::<$channel, 1>($format),
            2 => FormatAccessor::channels::<$channel, 2>($format),
            3 => FormatAccessor::channels::<$channel, 3>($format),
            _ => FormatAccessor::channels::<$channel, 4>($format),
        }
    };
}

impl Component {
    /// Bytes per channel.
    pub const fn size(self) -> usize {
        match self {
            Component::U8 | Component::I8 | Component::U8Unorm | Component::I8Snorm => 1,
            Component::U8Srgb => 1,
            Component::U16 | Component::I16 | Component::F16 => 2,
            Component::U16Unorm | Component::I16Snorm => 2,
            Component::U32 | Component::I32 | Component::F32 => 4,
            Component::U64 | Component::I64 | Component::F64 => 8,
        }
    }

    /// Format string for `count` consecutive channels of this component.
    ///
    /// Normalized and sRGB components report their storage type.
    pub fn format_str(self, count: usize) -> &'static str {
        match self {
            Component::U8 | Component::U8Unorm | Component::U8Srgb => counted!(count, "B"),
            Component::I8 | Component::I8Snorm => counted!(count, "b"),
            Component::U16 | Component::U16Unorm => counted!(count, "H"),
            Component::I16 | Component::I16Snorm => counted!(count, "h"),
            Component::U32 => counted!(count, "I"),
            Component::I32 => counted!(count, "i"),
            Component::U64 => counted!(count, "Q"),
            Component::I64 => counted!(count, "q"),
            Component::F16 => counted!(count, "e"),
            Component::F32 => counted!(count, "f"),
            Component::F64 => counted!(count, "d"),
        }
    }

    /// Accessor for `count` consecutive channels. Counts outside `1..=4`
    /// resolve to the unsupported sentinel.
    pub fn accessor(self, count: usize) -> FormatAccessor {
        if !(1..=4).contains(&count) {
            return FormatAccessor::unsupported(self.size() * count);
        }
        let format = self.format_str(count);
        match self {
            Component::U8 => by_count!(U8, count, format),
            Component::I8 => by_count!(I8, count, format),
            Component::U16 => by_count!(U16, count, format),
            Component::I16 => by_count!(I16, count, format),
            Component::U32 => by_count!(U32, count, format),
            Component::I32 => by_count!(I32, count, format),
            Component::U64 => by_count!(U64, count, format),
            Component::I64 => by_count!(I64, count, format),
            Component::F16 => half_accessor(count, format),
            Component::F32 => by_count!(F32, count, format),
            Component::F64 => by_count!(F64, count, format),
            Component::U8Unorm => by_count!(Unorm8, count, format),
            Component::I8Snorm => by_count!(Snorm8, count, format),
            Component::U16Unorm => by_count!(Unorm16, count, format),
            Component::I16Snorm => by_count!(Snorm16, count, format),
            Component::U8Srgb if count == 4 => FormatAccessor {
                format: Some(format),
                item_size: 4,
                decode: decode_srgb_alpha,
                encode: encode_srgb_alpha,
                supported: true,
            },
            Component::U8Srgb => by_count!(Srgb8, count, format),
        }
    }
}

#[cfg(feature = "half")]
fn half_accessor(count: usize, format: &'static str) -> FormatAccessor {
    by_count!(F16, count, format)
}

#[cfg(not(feature = "half"))]
fn half_accessor(count: usize, _format: &'static str) -> FormatAccessor {
    FormatAccessor::unsupported(2 * count)
}

// ============================================================================
// Format identifiers
// ============================================================================

/// Declares a format enum whose variants come in 1- to 4-channel families of
/// one [`Component`], plus standalone variants with an explicit mapping.
macro_rules! format_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            families { $( $component:ident => $one:ident, $two:ident, $three:ident, $four:ident; )* }
            extras { $( $extra:ident => $mapping:expr, $size:expr; )* }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $one, $two, $three, $four, )*
            $( $extra, )*
        }

        impl $name {
            /// Channel component and count, or `None` if the format has no
            /// accessor.
            pub fn channels(self) -> Option<(Component, usize)> {
                match self {
                    $(
                        $name::$one => Some((Component::$component, 1)),
                        $name::$two => Some((Component::$component, 2)),
                        $name::$three => Some((Component::$component, 3)),
                        $name::$four => Some((Component::$component, 4)),
                    )*
                    $( $name::$extra => $mapping, )*
                }
            }

            /// Item size in bytes, known even for formats without an accessor.
            pub fn size(self) -> usize {
                match self {
                    $( $name::$extra => $size, )*
                    #[allow(unreachable_patterns)]
                    other => other.channels().map_or(0, |(c, n)| c.size() * n),
                }
            }

            pub fn accessor(self) -> FormatAccessor {
                match self.channels() {
                    Some((component, count)) => component.accessor(count),
                    None => FormatAccessor::unsupported(self.size()),
                }
            }
        }
    };
}

format_enum! {
    /// Image pixel formats.
    pub enum PixelFormat {
        families {
            U8Unorm => R8Unorm, RG8Unorm, RGB8Unorm, RGBA8Unorm;
            I8Snorm => R8Snorm, RG8Snorm, RGB8Snorm, RGBA8Snorm;
            U8Srgb => R8Srgb, RG8Srgb, RGB8Srgb, RGBA8Srgb;
            U8 => R8UI, RG8UI, RGB8UI, RGBA8UI;
            I8 => R8I, RG8I, RGB8I, RGBA8I;
            U16Unorm => R16Unorm, RG16Unorm, RGB16Unorm, RGBA16Unorm;
            I16Snorm => R16Snorm, RG16Snorm, RGB16Snorm, RGBA16Snorm;
            U16 => R16UI, RG16UI, RGB16UI, RGBA16UI;
            I16 => R16I, RG16I, RGB16I, RGBA16I;
            U32 => R32UI, RG32UI, RGB32UI, RGBA32UI;
            I32 => R32I, RG32I, RGB32I, RGBA32I;
            F16 => R16F, RG16F, RGB16F, RGBA16F;
            F32 => R32F, RG32F, RGB32F, RGBA32F;
        }
        extras {
            Depth16Unorm => Some((Component::U16Unorm, 1)), 2;
            Depth32F => Some((Component::F32, 1)), 4;
            Stencil8UI => Some((Component::U8, 1)), 1;
            Depth16UnormStencil8UI => None, 4;
            Depth24UnormStencil8UI => None, 4;
            Depth32FStencil8UI => None, 8;
        }
    }
}

format_enum! {
    /// Mesh vertex attribute formats.
    pub enum VertexFormat {
        families {
            F32 => Float, Vector2, Vector3, Vector4;
            F16 => Half, Vector2h, Vector3h, Vector4h;
            F64 => Double, Vector2d, Vector3d, Vector4d;
            U8 => UnsignedByte, Vector2ub, Vector3ub, Vector4ub;
            U8Unorm => UnsignedByteNormalized, Vector2ubNormalized, Vector3ubNormalized, Vector4ubNormalized;
            I8 => Byte, Vector2b, Vector3b, Vector4b;
            I8Snorm => ByteNormalized, Vector2bNormalized, Vector3bNormalized, Vector4bNormalized;
            U16 => UnsignedShort, Vector2us, Vector3us, Vector4us;
            U16Unorm => UnsignedShortNormalized, Vector2usNormalized, Vector3usNormalized, Vector4usNormalized;
            I16 => Short, Vector2s, Vector3s, Vector4s;
            I16Snorm => ShortNormalized, Vector2sNormalized, Vector3sNormalized, Vector4sNormalized;
            U32 => UnsignedInt, Vector2ui, Vector3ui, Vector4ui;
            I32 => Int, Vector2i, Vector3i, Vector4i;
        }
        extras {
            Matrix2x2 => None, 16;
            Matrix3x3 => None, 36;
            Matrix4x4 => None, 64;
        }
    }
}

format_enum! {
    /// Scene field element types.
    pub enum SceneFieldType {
        families {
            F32 => Float, Vector2, Vector3, Vector4;
            F16 => Half, Vector2h, Vector3h, Vector4h;
            F64 => Double, Vector2d, Vector3d, Vector4d;
            U8 => UnsignedByte, Vector2ub, Vector3ub, Vector4ub;
            I8 => Byte, Vector2b, Vector3b, Vector4b;
            U16 => UnsignedShort, Vector2us, Vector3us, Vector4us;
            I16 => Short, Vector2s, Vector3s, Vector4s;
            U32 => UnsignedInt, Vector2ui, Vector3ui, Vector4ui;
            I32 => Int, Vector2i, Vector3i, Vector4i;
        }
        extras {
            UnsignedLong => Some((Component::U64, 1)), 8;
            Long => Some((Component::I64, 1)), 8;
            Quaternion => Some((Component::F32, 4)), 16;
            Quaterniond => Some((Component::F64, 4)), 32;
            Matrix3x3 => None, 36;
            Matrix4x4 => None, 64;
            Pointer => None, std::mem::size_of::<usize>();
            MutablePointer => None, std::mem::size_of::<usize>();
        }
    }
}

/// Any element format a view can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Plain bytes, exported with a null format string.
    Bytes,
    Array(Component),
    Pixel(PixelFormat),
    Vertex(VertexFormat),
    SceneField(SceneFieldType),
}

impl Format {
    /// Look up the accessor record. Never fails; see [`FormatAccessor::unsupported`].
    pub fn accessor(self) -> FormatAccessor {
        match self {
            Format::Bytes => FormatAccessor::BYTES,
            Format::Array(component) => component.accessor(1),
            Format::Pixel(format) => format.accessor(),
            Format::Vertex(format) => format.accessor(),
            Format::SceneField(format) => format.accessor(),
        }
    }
}

impl From<Component> for Format {
    fn from(c: Component) -> Self {
        Format::Array(c)
    }
}

impl From<PixelFormat> for Format {
    fn from(f: PixelFormat) -> Self {
        Format::Pixel(f)
    }
}

impl From<VertexFormat> for Format {
    fn from(f: VertexFormat) -> Self {
        Format::Vertex(f)
    }
}

impl From<SceneFieldType> for Format {
    fn from(f: SceneFieldType) -> Self {
        Format::SceneField(f)
    }
}
