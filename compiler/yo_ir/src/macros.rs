//! Internal macros.

/// Assert at compile time that a type has the expected size in bytes.
///
/// Keeps the hot id and span types from silently growing.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}
