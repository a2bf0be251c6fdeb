macro_rules! std {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "std")]
            #[cfg_attr(docsrs, doc(cfg(feature = "std")))]
            $item
        )*
    };
}

macro_rules! alloc {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "alloc")]
            #[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
            $item
        )*
    };
}

macro_rules! no_std_io {
    ($($item:item)*) => {
        $(
            #[cfg(all(feature = "embedded-io", not(feature = "std")))]
            #[cfg_attr(docsrs, doc(cfg(feature = "embedded-io")))]
            $item
        )*
    };
}

/// Assertion with implication / equivalence syntax for specifications in
/// tests and proofs.
#[cfg(any(test, kani))]
macro_rules! ensure {
    (( $($a:tt)* ) <==> ( $($b:tt)* )) => {
        assert!(($($a)*) == ($($b)*), "expected equivalence to hold");
    };
    (( $($a:tt)* ) ==> ( $($b:tt)* )) => {
        assert!(!($($a)*) || ($($b)*), "expected implication to hold");
    };
}
