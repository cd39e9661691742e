//! Logging macros
//!
//! The firmware logs through `defmt` (shipped over `esp-println`). Host builds with the
//! `std` feature print a level-tagged line instead, and anything else compiles the
//! arguments away. Format strings must stay within what `defmt` accepts: `{}` and `{:?}`
//! only, no width or precision.

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32")]
        ::defmt::trace!($($arg)*);

        #[cfg(all(not(feature = "esp32"), feature = "std"))]
        ::std::println!("[TRACE] {}", ::core::format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), not(feature = "std")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "esp32"), feature = "std"))]
        ::std::println!("[DEBUG] {}", ::core::format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), not(feature = "std")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "esp32"), feature = "std"))]
        ::std::println!("[INFO] {}", ::core::format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), not(feature = "std")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "esp32"), feature = "std"))]
        ::std::eprintln!("[WARN] {}", ::core::format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), not(feature = "std")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "esp32"), feature = "std"))]
        ::std::eprintln!("[ERROR] {}", ::core::format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), not(feature = "std")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}
