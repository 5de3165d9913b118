use std::sync::OnceLock;

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceFlags: u8 {
        const DISPATCH = 0b0000_0001;
        const QUEUE = 0b0000_0010;
        const READ = 0b0000_0100;
        const FILL = 0b0000_1000;
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

/// Parse a `VCS_TRACE` value such as `dispatch,read` or `all`. Unknown names are ignored.
pub fn parse_trace_flags(value: &str) -> TraceFlags {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .fold(TraceFlags::empty(), |flags, name| match name.as_str() {
            "dispatch" => flags | TraceFlags::DISPATCH,
            "queue" => flags | TraceFlags::QUEUE,
            "read" => flags | TraceFlags::READ,
            "fill" => flags | TraceFlags::FILL,
            "all" | "1" => TraceFlags::all(),
            _ => flags,
        })
}

pub fn trace_flags() -> TraceFlags {
    static FLAGS: OnceLock<TraceFlags> = OnceLock::new();
    *FLAGS.get_or_init(|| {
        std::env::var("VCS_TRACE")
            .map(|v| parse_trace_flags(&v))
            .unwrap_or(TraceFlags::empty())
    })
}

#[inline]
pub fn trace(flag: TraceFlags) -> bool {
    trace_flags().contains(flag)
}

pub fn quiet() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("QUIET", false))
}
