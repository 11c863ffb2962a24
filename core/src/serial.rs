use crate::{bit::Bit, bus::MemoryBus};

// 6551-style ACIA in the slot-2 address block.
pub const SERIAL_DATA: u16 = 0xC0A8;
pub const SERIAL_STATUS: u16 = 0xC0A9;
pub const SERIAL_COMMAND: u16 = 0xC0AA;
pub const SERIAL_CONTROL: u16 = 0xC0AB;

/*
Status register:
Bit 4 - Transmit data register empty (always set, transmits are synchronous)
Bit 3 - Receive data register full
Bit 2 - Overrun (a byte arrived while one was still latched)
*/
pub const RX_FULL_BIT: usize = 3;
pub const TX_EMPTY_BIT: usize = 4;
pub const OVERRUN_BIT: usize = 2;

// Configuration the monitor's initialize routine writes: interrupts off,
// 8 data bits, 1 stop bit, 9600 baud.
pub const INIT_COMMAND: u8 = 0x0B;
pub const INIT_CONTROL: u8 = 0x1E;

// Bytes written to the data register go out through the callback.
pub type SerialCallback = Option<Box<dyn Fn(u8)>>;

pub struct Serial {
    // Holds the last byte received off the wire.
    data: u8,
    rx_full: bool,
    overrun: bool,

    // Configuration latches; the emulated wire has no real baud rate, they
    // just read back what was written.
    command: u8,
    control: u8,

    callback: SerialCallback,
}

impl Serial {
    pub fn new(callback: SerialCallback) -> Self {
        Self {
            data: 0,
            rx_full: false,
            overrun: false,
            command: 0,
            control: 0,
            callback,
        }
    }

    // Host side of the wire: latch one incoming byte.
    pub fn receive(&mut self, b: u8) {
        if self.rx_full {
            self.overrun = true;
        }
        self.data = b;
        self.rx_full = true;
    }
}

impl MemoryBus for Serial {
    fn read_byte(&mut self, address: u16) -> u8 {
        match address {
            SERIAL_DATA => {
                self.rx_full = false;
                self.overrun = false;
                self.data
            }
            SERIAL_STATUS => {
                let mut b: u8 = 0;
                b.set(TX_EMPTY_BIT);
                if self.rx_full {
                    b.set(RX_FULL_BIT);
                }
                if self.overrun {
                    b.set(OVERRUN_BIT);
                }
                b
            }
            SERIAL_COMMAND => self.command,
            SERIAL_CONTROL => self.control,
            _ => unreachable!(),
        }
    }

    fn write_byte(&mut self, address: u16, b: u8) {
        match address {
            SERIAL_DATA => {
                if let Some(callback) = &self.callback {
                    (callback)(b);
                }
            }
            SERIAL_STATUS => {}
            SERIAL_COMMAND => self.command = b,
            SERIAL_CONTROL => self.control = b,
            _ => unreachable!(),
        }
    }
}
