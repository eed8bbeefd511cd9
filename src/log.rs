//! Driver logging, contingent on the hidden `__log` feature
//!
//! `debug!` marks device state changes, `trace!` marks each data packet,
//! and `warn!` marks host misbehavior. Without `__log`, every call compiles
//! to nothing, arguments included.
//!
//! Only enable `__log` when you're certain that your logger doesn't write
//! to this serial port!

macro_rules! log_at {
    ($level:ident, $($args:tt)*) => {
        #[cfg(feature = "__log")]
        ::__log::log!(::__log::Level::$level, $($args)*)
    };
}

macro_rules! debug {
    ($($args:tt)*) => { log_at!(Debug, $($args)*) };
}

macro_rules! trace {
    ($($args:tt)*) => { log_at!(Trace, $($args)*) };
}

macro_rules! warn {
    ($($args:tt)*) => { log_at!(Warn, $($args)*) };
}
