//! Kernel error taxonomy and POSIX-style errno mapping.
//!
//! `KernelError` is the internal failure type subsystems return to each
//! other; `Errno` is what crosses a syscall boundary. Leaf failures return a
//! `KernelError`, intermediate layers forward it unchanged, and only the
//! top-level service (shell command, socket syscall, filesystem syscall)
//! converts it into the `Errno` a caller sees.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// No free PCB slot, inode, block, page, or socket.
    ResourceExhausted,
    /// File, interface, or socket not found.
    NotFound,
    /// Out-of-range index, wrong file type, invalid path.
    BadArgument,
    /// Underlying block read/write returned negative.
    IoError,
    /// Truncated packet, bad checksum, unknown ethertype/protocol.
    ProtocolViolation,
    /// Operation not supported on this object.
    NotSupported,
    /// Caller would need to block; no data/slot available right now.
    WouldBlock,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    Eperm = 1,
    Enoent = 2,
    Eio = 5,
    Enomem = 12,
    Eacces = 13,
    Efault = 14,
    Ebusy = 16,
    Eexist = 17,
    Enodev = 19,
    Enotdir = 20,
    Eisdir = 21,
    Einval = 22,
    Emfile = 24,
    Enospc = 28,
    Eagain = 11,
    Enosys = 38,
    Emsgsize = 90,
    Eprotocol = 71,
}

impl From<KernelError> for Errno {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::ResourceExhausted => Errno::Enomem,
            KernelError::NotFound => Errno::Enoent,
            KernelError::BadArgument => Errno::Einval,
            KernelError::IoError => Errno::Eio,
            KernelError::ProtocolViolation => Errno::Eprotocol,
            KernelError::NotSupported => Errno::Enosys,
            KernelError::WouldBlock => Errno::Eagain,
        }
    }
}

impl Errno {
    pub fn as_negative(self) -> i32 {
        -(self as i32)
    }

    pub fn description(self) -> &'static str {
        match self {
            Errno::Eperm => "operation not permitted",
            Errno::Enoent => "no such file or directory",
            Errno::Eio => "I/O error",
            Errno::Enomem => "out of memory",
            Errno::Eacces => "permission denied",
            Errno::Efault => "bad address",
            Errno::Ebusy => "device or resource busy",
            Errno::Eexist => "file exists",
            Errno::Enodev => "no such device",
            Errno::Enotdir => "not a directory",
            Errno::Eisdir => "is a directory",
            Errno::Einval => "invalid argument",
            Errno::Emfile => "too many open files",
            Errno::Enospc => "file out of space",
            Errno::Eagain => "would block",
            Errno::Enosys => "function not implemented",
            Errno::Emsgsize => "message too long",
            Errno::Eprotocol => "protocol error",
        }
    }
}

pub type Result<T> = core::result::Result<T, Errno>;
pub type KResult<T> = core::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_resource_exhausted_to_enomem() {
        assert_eq!(Errno::from(KernelError::ResourceExhausted), Errno::Enomem);
    }

    #[test]
    fn negative_round_trips_pid_value() {
        assert_eq!(Errno::Einval.as_negative(), -22);
    }
}
