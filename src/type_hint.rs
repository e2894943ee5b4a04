use std::marker::PhantomData;

/// Zero-sized marker that pins a type parameter an operator struct would
/// otherwise leave unconstrained in its trait impls.
pub struct TypeHint<T>(PhantomData<fn() -> T>);

impl<T> TypeHint<T> {
  #[inline]
  pub fn new() -> Self { TypeHint(PhantomData) }
}

impl<T> Default for TypeHint<T> {
  #[inline]
  fn default() -> Self { Self::new() }
}

impl<T> Clone for TypeHint<T> {
  #[inline]
  fn clone(&self) -> Self { Self::new() }
}

impl<T> Copy for TypeHint<T> {}
