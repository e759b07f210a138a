//! COM1 serial console and `hlt` for a real x86 build.
//!
//! This is the one place allowed to know about actual hardware ports; it
//! exists only so the rest of the tree has something to link against in a
//! freestanding build and is not itself a subject of this crate's design.

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

const COM1_PORT: u16 = 0x3f8;

lazy_static! {
    static ref SERIAL1: Mutex<SerialPort> = {
        let mut port = unsafe { SerialPort::new(COM1_PORT) };
        port.init();
        Mutex::new(port)
    };
}

pub fn serial_write(bytes: &[u8]) {
    for &b in bytes {
        SERIAL1.lock().send(b);
    }
}

pub fn hlt() {
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack));
    }
}
