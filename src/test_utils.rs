use core::fmt;
use core::ops;
use proptest::arbitrary::{any, Arbitrary};
use proptest::array;
use proptest::num::u8::Any;
use proptest::strategy::{BoxedStrategy, Strategy};

/// An arbitrary byte buffer bounded in size, backed by an array.
#[derive(Clone, Copy)]
pub struct BoundList<const C: usize> {
    inner: [u8; C],
    len: usize,
}

impl<const C: usize> fmt::Debug for BoundList<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut dbg = f.debug_struct("BoundList");
        dbg.field("len", &self.len());

        if C <= 32 {
            dbg.field("inner", &self.as_slice());
        }

        dbg.finish()
    }
}

impl<const C: usize> BoundList<C> {
    pub const fn new_with_unchecked(inner: [u8; C], len: usize) -> Self {
        Self { inner, len }
    }

    #[inline]
    pub const fn new_zeroes_unchecked(len: usize) -> Self {
        Self::new_with_unchecked([0u8; C], len)
    }

    #[track_caller]
    #[inline]
    pub fn new_zeroes(len: usize) -> Self {
        assert!(len <= C, "New zeroes provided len greater than capacity");
        Self::new_zeroes_unchecked(len)
    }

    /// A zeroed buffer of the same length as this one.
    #[inline]
    pub const fn create_self(&self) -> Self {
        Self::new_zeroes_unchecked(self.len)
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner.as_slice()[..self.len()]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len();
        &mut self.inner.as_mut_slice()[..len]
    }
}

impl<const C: usize> PartialEq for BoundList<C> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<const C: usize> ops::Deref for BoundList<C> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<const C: usize> ops::DerefMut for BoundList<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

#[cfg(kani)]
impl<const C: usize> kani::Arbitrary for BoundList<C> {
    fn any() -> Self {
        let len: usize = kani::any();
        kani::assume(len <= C);

        let buf: [u8; C] = kani::any();
        Self::new_with_unchecked(buf, len)
    }
}

impl<const C: usize> Arbitrary for BoundList<C> {
    type Parameters = ();

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (0..=C, array::uniform::<Any, C>(any::<u8>()))
            .prop_map(|(len, buf)| BoundList::new_with_unchecked(buf, len))
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}
