use std::{fmt::Debug, marker::PhantomData};

use crate::{Error, Result};

/// A numeric type weight sums are accumulated in.
///
/// Integral types report arithmetic that leaves their range; floating point
/// types are never range checked and are compared within a tolerance by
/// `check_tree`.
pub trait Weight: Copy + Default + PartialEq + PartialOrd + Debug {
    #[inline(always)]
    fn zero() -> Self {
        Self::default()
    }

    fn one() -> Self;

    fn from_f64(v: f64) -> Self;

    fn checked_add(self, rhs: Self) -> Option<Self>;

    fn checked_sub(self, rhs: Self) -> Option<Self>;

    /// Exact equality for integral types, `|self - other| <= epsilon` otherwise.
    fn approx_eq(self, other: Self, epsilon: f64) -> bool;
}

macro_rules! integral_weight {
    ($($t:ty),*) => {$(
        impl Weight for $t {
            #[inline(always)]
            fn one() -> Self {
                1
            }

            #[inline(always)]
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            #[inline(always)]
            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$t>::checked_add(self, rhs)
            }

            #[inline(always)]
            fn checked_sub(self, rhs: Self) -> Option<Self> {
                <$t>::checked_sub(self, rhs)
            }

            #[inline(always)]
            fn approx_eq(self, other: Self, _epsilon: f64) -> bool {
                self == other
            }
        }
    )*};
}

macro_rules! float_weight {
    ($($t:ty),*) => {$(
        impl Weight for $t {
            #[inline(always)]
            fn one() -> Self {
                1.0
            }

            #[inline(always)]
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            #[inline(always)]
            fn checked_add(self, rhs: Self) -> Option<Self> {
                Some(self + rhs)
            }

            #[inline(always)]
            fn checked_sub(self, rhs: Self) -> Option<Self> {
                Some(self - rhs)
            }

            #[inline(always)]
            fn approx_eq(self, other: Self, epsilon: f64) -> bool {
                (self as f64 - other as f64).abs() <= epsilon
            }
        }
    )*};
}

integral_weight!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
float_weight!(f32, f64);

#[inline]
pub(crate) fn add<W: Weight>(lhs: W, rhs: W) -> Result<W> {
    lhs.checked_add(rhs).ok_or(if rhs > W::zero() {
        Error::Overflow
    } else {
        Error::Underflow
    })
}

#[inline]
pub(crate) fn sub<W: Weight>(lhs: W, rhs: W) -> Result<W> {
    lhs.checked_sub(rhs).ok_or(if rhs > W::zero() {
        Error::Underflow
    } else {
        Error::Overflow
    })
}

/// Component-wise `acc += rhs`.
pub(crate) fn add_assign<W: Weight>(acc: &mut [W], rhs: &[W]) -> Result<()> {
    for (a, r) in acc.iter_mut().zip(rhs) {
        *a = add(*a, *r)?;
    }
    Ok(())
}

/// Maps an element to a fixed number of weight components.
///
/// The component count must not change over the lifetime of a tree and the
/// result may only depend on the key and value.
pub trait WeightFn<K, V> {
    type Output: Weight;

    #[inline(always)]
    fn components(&self) -> usize {
        1
    }

    /// Writes exactly `components()` values into `out`.
    fn weigh(&self, key: &K, value: &V, out: &mut [Self::Output]);
}

/// Every element weighs one, turning sums into ranks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count<W = usize>(PhantomData<fn() -> W>);

impl<W> Count<W> {
    pub fn new() -> Self {
        Count(PhantomData)
    }
}

impl<K, V, W: Weight> WeightFn<K, V> for Count<W> {
    type Output = W;

    #[inline(always)]
    fn weigh(&self, _key: &K, _value: &V, out: &mut [W]) {
        out[0] = W::one();
    }
}

/// One component per exponent: `key.powf(a)`.
#[derive(Debug, Clone)]
pub struct Powers<W = f64> {
    exponents: Vec<f64>,
    _weight: PhantomData<fn() -> W>,
}

impl<W> Powers<W> {
    pub fn new(exponents: impl Into<Vec<f64>>) -> Self {
        Powers {
            exponents: exponents.into(),
            _weight: PhantomData,
        }
    }

    pub fn exponents(&self) -> &[f64] {
        &self.exponents
    }
}

impl<K: Copy + Into<f64>, V, W: Weight> WeightFn<K, V> for Powers<W> {
    type Output = W;

    fn components(&self) -> usize {
        self.exponents.len()
    }

    fn weigh(&self, key: &K, _value: &V, out: &mut [W]) {
        let x: f64 = (*key).into();
        for (o, a) in out.iter_mut().zip(&self.exponents) {
            *o = W::from_f64(x.powf(*a));
        }
    }
}

/// Like [`Powers`], with each component scaled by the mapped value:
/// `value * key.powf(a)`. Useful when the value is a multiplicity.
#[derive(Debug, Clone)]
pub struct ScaledPowers<W = f64> {
    exponents: Vec<f64>,
    _weight: PhantomData<fn() -> W>,
}

impl<W> ScaledPowers<W> {
    pub fn new(exponents: impl Into<Vec<f64>>) -> Self {
        ScaledPowers {
            exponents: exponents.into(),
            _weight: PhantomData,
        }
    }
}

impl<K, V, W> WeightFn<K, V> for ScaledPowers<W>
where
    K: Copy + Into<f64>,
    V: Copy + Into<f64>,
    W: Weight,
{
    type Output = W;

    fn components(&self) -> usize {
        self.exponents.len()
    }

    fn weigh(&self, key: &K, value: &V, out: &mut [W]) {
        let x: f64 = (*key).into();
        let n: f64 = (*value).into();
        for (o, a) in out.iter_mut().zip(&self.exponents) {
            *o = W::from_f64(n * x.powf(*a));
        }
    }
}

/// Adapts a scalar closure `Fn(&K, &V) -> W`.
pub struct FnWeight<F, W> {
    f: F,
    _weight: PhantomData<fn() -> W>,
}

impl<F, W> FnWeight<F, W> {
    pub fn new(f: F) -> Self {
        FnWeight {
            f,
            _weight: PhantomData,
        }
    }
}

impl<K, V, W: Weight, F: Fn(&K, &V) -> W> WeightFn<K, V> for FnWeight<F, W> {
    type Output = W;

    #[inline(always)]
    fn weigh(&self, key: &K, value: &V, out: &mut [W]) {
        out[0] = (self.f)(key, value);
    }
}

/// Adapts a closure filling `components` values at once.
pub struct FnWeights<F, W> {
    f: F,
    components: usize,
    _weight: PhantomData<fn() -> W>,
}

impl<F, W> FnWeights<F, W> {
    pub fn new(components: usize, f: F) -> Self {
        FnWeights {
            f,
            components,
            _weight: PhantomData,
        }
    }
}

impl<K, V, W: Weight, F: Fn(&K, &V, &mut [W])> WeightFn<K, V> for FnWeights<F, W> {
    type Output = W;

    fn components(&self) -> usize {
        self.components
    }

    fn weigh(&self, key: &K, value: &V, out: &mut [W]) {
        (self.f)(key, value, out)
    }
}
