//! Internal logging macros.
//!
//! Route to the `log` crate when the `log` feature is enabled and compile to
//! nothing otherwise. Arguments are still type-checked in both builds.

macro_rules! mr_trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::trace!(target: "streamalloc", $($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    }};
}

macro_rules! mr_debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::debug!(target: "streamalloc", $($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    }};
}

macro_rules! mr_warn {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::warn!(target: "streamalloc", $($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    }};
}

macro_rules! mr_error {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::error!(target: "streamalloc", $($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    }};
}

pub(crate) use {mr_debug, mr_error, mr_trace, mr_warn};
