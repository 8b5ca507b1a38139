//! Uniform payloads
//!
//! [`UniformValue`] is the closed set of values a uniform can be queued with.
//! Dedup compares values with [`UniformValue::approx_eq`]: float-bearing
//! kinds use a fixed absolute tolerance, everything else is exact, and values
//! of different kinds never match.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::context::{GraphicsContext, UniformLocation};

/// Absolute per-component tolerance used when comparing float-bearing uniforms
pub const UNIFORM_EPSILON: f32 = 1e-6;

/// Kind tag of a [`UniformValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    FloatArray,
    IntArray,
    Vec3Array,
    Vec4Array,
    Mat4Array,
}

/// A uniform payload.
///
/// The derived `PartialEq` is exact; state dedup goes through [`approx_eq`](Self::approx_eq).
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
    Vec3Array(Vec<Vec3>),
    Vec4Array(Vec<Vec4>),
    Mat4Array(Vec<Mat4>),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Bool(_) => UniformKind::Bool,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::FloatArray(_) => UniformKind::FloatArray,
            UniformValue::IntArray(_) => UniformKind::IntArray,
            UniformValue::Vec3Array(_) => UniformKind::Vec3Array,
            UniformValue::Vec4Array(_) => UniformKind::Vec4Array,
            UniformValue::Mat4Array(_) => UniformKind::Mat4Array,
        }
    }

    /// Number of elements for array kinds, 1 otherwise
    pub fn len(&self) -> usize {
        match self {
            UniformValue::FloatArray(v) => v.len(),
            UniformValue::IntArray(v) => v.len(),
            UniformValue::Vec3Array(v) => v.len(),
            UniformValue::Vec4Array(v) => v.len(),
            UniformValue::Mat4Array(v) => v.len(),
            _ => 1,
        }
    }

    /// True for an array kind with no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compare two values the way the state cache does.
    ///
    /// Float components match when `|a - b| <= UNIFORM_EPSILON`. Arrays must
    /// also have the same length.
    pub fn approx_eq(&self, other: &UniformValue) -> bool {
        match (self, other) {
            (UniformValue::Bool(a), UniformValue::Bool(b)) => a == b,
            (UniformValue::Int(a), UniformValue::Int(b)) => a == b,
            (UniformValue::Float(a), UniformValue::Float(b)) => float_eq(*a, *b),
            (UniformValue::Vec2(a), UniformValue::Vec2(b)) => a.abs_diff_eq(*b, UNIFORM_EPSILON),
            (UniformValue::Vec3(a), UniformValue::Vec3(b)) => a.abs_diff_eq(*b, UNIFORM_EPSILON),
            (UniformValue::Vec4(a), UniformValue::Vec4(b)) => a.abs_diff_eq(*b, UNIFORM_EPSILON),
            (UniformValue::Mat3(a), UniformValue::Mat3(b)) => a.abs_diff_eq(*b, UNIFORM_EPSILON),
            (UniformValue::Mat4(a), UniformValue::Mat4(b)) => a.abs_diff_eq(*b, UNIFORM_EPSILON),
            (UniformValue::FloatArray(a), UniformValue::FloatArray(b)) => {
                slices_eq(a, b, |x, y| float_eq(*x, *y))
            }
            (UniformValue::IntArray(a), UniformValue::IntArray(b)) => a == b,
            (UniformValue::Vec3Array(a), UniformValue::Vec3Array(b)) => {
                slices_eq(a, b, |x, y| x.abs_diff_eq(*y, UNIFORM_EPSILON))
            }
            (UniformValue::Vec4Array(a), UniformValue::Vec4Array(b)) => {
                slices_eq(a, b, |x, y| x.abs_diff_eq(*y, UNIFORM_EPSILON))
            }
            (UniformValue::Mat4Array(a), UniformValue::Mat4Array(b)) => {
                slices_eq(a, b, |x, y| x.abs_diff_eq(*y, UNIFORM_EPSILON))
            }
            _ => false,
        }
    }

    /// Issue the setter matching this value's kind.
    ///
    /// Returns `false` when nothing was sent (empty arrays).
    pub(crate) fn apply<G: GraphicsContext + ?Sized>(
        &self,
        ctx: &mut G,
        location: UniformLocation,
    ) -> bool {
        match self {
            UniformValue::Bool(v) => ctx.set_uniform_i32(location, i32::from(*v)),
            UniformValue::Int(v) => ctx.set_uniform_i32(location, *v),
            UniformValue::Float(v) => ctx.set_uniform_f32(location, *v),
            UniformValue::Vec2(v) => ctx.set_uniform_vec2(location, *v),
            UniformValue::Vec3(v) => ctx.set_uniform_vec3(location, *v),
            UniformValue::Vec4(v) => ctx.set_uniform_vec4(location, *v),
            UniformValue::Mat3(v) => ctx.set_uniform_mat3(location, v),
            UniformValue::Mat4(v) => ctx.set_uniform_mat4(location, v),
            _ if self.is_empty() => return false,
            UniformValue::FloatArray(v) => ctx.set_uniform_f32_array(location, v),
            UniformValue::IntArray(v) => ctx.set_uniform_i32_array(location, v),
            UniformValue::Vec3Array(v) => ctx.set_uniform_vec3_array(location, v),
            UniformValue::Vec4Array(v) => ctx.set_uniform_vec4_array(location, v),
            UniformValue::Mat4Array(v) => ctx.set_uniform_mat4_array(location, v),
        }
        true
    }
}

#[inline]
fn float_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= UNIFORM_EPSILON
}

#[inline]
fn slices_eq<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq(x, y))
}

macro_rules! impl_from_uniform {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_uniform! {
    bool => Bool,
    i32 => Int,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat3 => Mat3,
    Mat4 => Mat4,
    Vec<f32> => FloatArray,
    Vec<i32> => IntArray,
    Vec<Vec3> => Vec3Array,
    Vec<Vec4> => Vec4Array,
    Vec<Mat4> => Mat4Array,
}

impl From<&[f32]> for UniformValue {
    fn from(values: &[f32]) -> Self {
        UniformValue::FloatArray(values.to_vec())
    }
}

impl From<&[i32]> for UniformValue {
    fn from(values: &[i32]) -> Self {
        UniformValue::IntArray(values.to_vec())
    }
}

impl From<&[Vec3]> for UniformValue {
    fn from(values: &[Vec3]) -> Self {
        UniformValue::Vec3Array(values.to_vec())
    }
}

impl From<&[Vec4]> for UniformValue {
    fn from(values: &[Vec4]) -> Self {
        UniformValue::Vec4Array(values.to_vec())
    }
}

impl From<&[Mat4]> for UniformValue {
    fn from(values: &[Mat4]) -> Self {
        UniformValue::Mat4Array(values.to_vec())
    }
}
