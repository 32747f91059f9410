//! Callable shapes.
//!
//! Every delegate is generic over an argument tuple `A` and a return type
//! `R`. The traits here bridge ordinary Rust callables of arity 0 through 16
//! onto that single shape, so one `Delegate<A, R>` definition covers every
//! arity:
//!
//! - [`Handler`]: any `Fn(T1, .., Tn) -> R` closure.
//! - [`FnPointer`]: a plain `fn(T1, .., Tn) -> R`, whose address doubles as
//!   its identity.
//! - [`Method`]: a `fn(&Recv, T1, .., Tn) -> R`, invoked against a bound
//!   receiver.

/// A callable taking its arguments as one tuple.
pub trait Handler<A, R>: Send + Sync + 'static {
    /// Call with the packed argument tuple.
    fn call(&self, args: A) -> R;
}

/// A plain function pointer usable as a leaf callback.
///
/// Function items must be cast to their pointer type first, e.g.
/// `double as fn(i32) -> i32`.
pub trait FnPointer<A, R>: Handler<A, R> + Copy {
    /// Code address of the function.
    fn address(self) -> usize;
}

/// A function taking a receiver reference followed by the unpacked
/// arguments.
pub trait Method<Recv, A, R>: Copy + Send + Sync + 'static {
    /// Call against `receiver` with the packed argument tuple.
    fn call(self, receiver: &Recv, args: A) -> R;

    /// Code address of the function.
    fn address(self) -> usize;
}

macro_rules! impl_arity {
    ($($T:ident),*) => {
        impl<F, R, $($T,)*> Handler<($($T,)*), R> for F
        where
            F: Fn($($T),*) -> R + Send + Sync + 'static,
        {
            #[allow(non_snake_case, clippy::unused_unit)]
            #[inline]
            fn call(&self, ($($T,)*): ($($T,)*)) -> R {
                (self)($($T),*)
            }
        }

        impl<R: 'static, $($T: 'static,)*> FnPointer<($($T,)*), R> for fn($($T),*) -> R {
            #[inline]
            fn address(self) -> usize {
                self as usize
            }
        }

        impl<Recv: 'static, R: 'static, $($T: 'static,)*> Method<Recv, ($($T,)*), R>
            for fn(&Recv, $($T),*) -> R
        {
            #[allow(non_snake_case)]
            #[inline]
            fn call(self, receiver: &Recv, ($($T,)*): ($($T,)*)) -> R {
                self(receiver, $($T),*)
            }

            #[inline]
            fn address(self) -> usize {
                self as usize
            }
        }
    };
}

impl_arity!();
impl_arity!(T1);
impl_arity!(T1, T2);
impl_arity!(T1, T2, T3);
impl_arity!(T1, T2, T3, T4);
impl_arity!(T1, T2, T3, T4, T5);
impl_arity!(T1, T2, T3, T4, T5, T6);
impl_arity!(T1, T2, T3, T4, T5, T6, T7);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15);
impl_arity!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15, T16);
